//! Store that recomputes VWAP from the full window on each read

use serde_json::Value;

use super::VwapStore;
use super::ticker::extract_trade;
use super::window::{Sample, WindowSet};
use crate::Result;
use crate::config::FieldNames;

/// Reference aggregation: O(window) per read, no running state.
#[derive(Debug, Clone)]
pub struct RecomputingStore {
    windows: WindowSet,
    fields: FieldNames,
}

impl RecomputingStore {
    pub fn new<I, S>(instruments: I, fields: FieldNames, capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { windows: WindowSet::new(instruments, capacity), fields }
    }

    /// Insert a sample directly, bypassing message parsing.
    pub fn push(&mut self, instrument: &str, sample: Sample) -> bool {
        match self.windows.position(instrument) {
            Some(slot) => {
                self.windows.window_mut(slot).push(sample);
                true
            }
            None => false,
        }
    }
}

impl VwapStore for RecomputingStore {
    fn store(&mut self, message: &Value) -> Result<bool> {
        match extract_trade(message, &self.fields)? {
            Some((instrument, sample)) => Ok(self.push(instrument, sample)),
            None => Ok(false),
        }
    }

    fn instruments(&self) -> &[String] {
        self.windows.instruments()
    }

    fn vwap(&self, instrument: &str) -> Option<f64> {
        self.windows.get(instrument).map(|w| w.vwap())
    }

    fn points(&self, instrument: &str) -> Option<usize> {
        self.windows.get(instrument).map(|w| w.len())
    }
}
