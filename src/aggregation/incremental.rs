//! Store that maintains running sums per instrument

use serde_json::Value;
use tracing::trace;

use super::VwapStore;
use super::ticker::extract_trade;
use super::window::{Sample, SampleWindow, WindowSet};
use crate::Result;
use crate::config::FieldNames;

#[derive(Debug, Clone, Copy, Default)]
struct RunningSums {
    notional: f64,
    quantity: f64,
    /// Samples in the window with a non-zero quantity.
    weighted: usize,
    /// Evictions since the sums were last rebuilt.
    evictions: usize,
}

impl RunningSums {
    fn add(&mut self, sample: &Sample) {
        self.notional += sample.notional();
        self.quantity += sample.quantity;
        if sample.quantity != 0.0 {
            self.weighted += 1;
        }
    }

    fn remove(&mut self, sample: &Sample) {
        self.notional -= sample.notional();
        self.quantity -= sample.quantity;
        if sample.quantity != 0.0 {
            self.weighted -= 1;
        }
        self.evictions += 1;
    }

    /// Recompute from scratch, in window order.
    fn rebuild(window: &SampleWindow) -> Self {
        let mut sums = Self::default();
        for sample in window.iter() {
            sums.add(sample);
        }
        sums
    }

    fn vwap(&self) -> f64 {
        if self.weighted == 0 || self.quantity == 0.0 { 0.0 } else { self.notional / self.quantity }
    }
}

/// O(1) amortized aggregation: each insert adds the new sample's
/// contribution and subtracts the evicted one's.
///
/// Subtraction leaves rounding residue that would otherwise accumulate over
/// the store's lifetime, so the sums are rebuilt from the window after every
/// `capacity` evictions. A window whose samples all have zero quantity
/// reports 0.0 regardless of residue.
#[derive(Debug, Clone)]
pub struct IncrementalStore {
    windows: WindowSet,
    sums: Vec<RunningSums>,
    fields: FieldNames,
}

impl IncrementalStore {
    pub fn new<I, S>(instruments: I, fields: FieldNames, capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let windows = WindowSet::new(instruments, capacity);
        let sums = vec![RunningSums::default(); windows.instruments().len()];
        Self { windows, sums, fields }
    }

    /// Insert a sample directly, bypassing message parsing.
    pub fn push(&mut self, instrument: &str, sample: Sample) -> bool {
        let Some(slot) = self.windows.position(instrument) else {
            return false;
        };

        let sums = &mut self.sums[slot];
        sums.add(&sample);
        let window = self.windows.window_mut(slot);
        if let Some(evicted) = window.push(sample) {
            trace!(instrument, price = evicted.price, "evicted oldest sample");
            sums.remove(&evicted);
            if sums.evictions >= window.capacity() {
                *sums = RunningSums::rebuild(window);
            }
        }
        true
    }
}

impl VwapStore for IncrementalStore {
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
        self.windows.position(instrument).map(|slot| self.sums[slot].vwap())
    }

    fn points(&self, instrument: &str) -> Option<usize> {
        self.windows.get(instrument).map(|w| w.len())
    }
}
