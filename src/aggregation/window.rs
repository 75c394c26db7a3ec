//! Bounded per-instrument sample windows

use std::collections::{HashMap, VecDeque};

/// One trade tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub price: f64,
    pub quantity: f64,
}

impl Sample {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }

    /// `price · quantity`
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

/// FIFO window holding at most `capacity` samples.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append a sample, returning the oldest one if the window overflowed.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity { self.samples.pop_front() } else { None }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// VWAP from a full pass over the window; 0.0 when the quantity sum is zero.
    pub fn vwap(&self) -> f64 {
        let (pq, q) = self
            .samples
            .iter()
            .fold((0.0, 0.0), |(pq, q), sample| (pq + sample.notional(), q + sample.quantity));
        if q == 0.0 { 0.0 } else { pq / q }
    }
}

/// Windows for a fixed, ordered set of instruments.
///
/// The set is fixed at construction; duplicates keep their first position.
#[derive(Debug, Clone)]
pub struct WindowSet {
    instruments: Vec<String>,
    index: HashMap<String, usize>,
    windows: Vec<SampleWindow>,
}

impl WindowSet {
    pub fn new<I, S>(instruments: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self { instruments: Vec::new(), index: HashMap::new(), windows: Vec::new() };
        for instrument in instruments {
            let instrument = instrument.into();
            if set.index.contains_key(&instrument) {
                continue;
            }
            set.index.insert(instrument.clone(), set.instruments.len());
            set.instruments.push(instrument);
            set.windows.push(SampleWindow::new(capacity));
        }
        set
    }

    /// Configured instruments in report order.
    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    /// Slot of `instrument`, if configured.
    pub fn position(&self, instrument: &str) -> Option<usize> {
        self.index.get(instrument).copied()
    }

    pub fn get(&self, instrument: &str) -> Option<&SampleWindow> {
        self.position(instrument).map(|i| &self.windows[i])
    }

    pub fn window(&self, slot: usize) -> &SampleWindow {
        &self.windows[slot]
    }

    pub fn window_mut(&mut self, slot: usize) -> &mut SampleWindow {
        &mut self.windows[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_evicts_oldest_only() {
        let mut window = SampleWindow::new(200);
        for i in 0..200 {
            assert_eq!(window.push(Sample::new(i as f64, 1.0)), None);
        }
        assert_eq!(window.len(), 200);

        let evicted = window.push(Sample::new(200.0, 1.0));

        assert_eq!(evicted, Some(Sample::new(0.0, 1.0)));
        assert_eq!(window.len(), 200);
        let prices: Vec<f64> = window.iter().map(|s| s.price).collect();
        let expected: Vec<f64> = (1..=200).map(|i| i as f64).collect();
        assert_eq!(prices, expected);
    }

    #[test]
    fn vwap_of_empty_or_zero_quantity_is_zero() {
        let mut window = SampleWindow::new(4);
        assert_eq!(window.vwap(), 0.0);

        window.push(Sample::new(10.0, 0.0));
        assert_eq!(window.vwap(), 0.0);
    }

    #[test]
    fn vwap_weights_by_quantity() {
        let mut window = SampleWindow::new(4);
        window.push(Sample::new(100.0, 3.0));
        window.push(Sample::new(106.0, 1.0));
        assert!((window.vwap() - 101.5).abs() < 1e-12);
    }

    #[test]
    fn window_set_keeps_first_occurrence_order() {
        let set = WindowSet::new(["ETH-BTC", "BTC-USD", "ETH-BTC"], 10);
        assert_eq!(set.instruments(), ["ETH-BTC", "BTC-USD"]);
        assert_eq!(set.position("BTC-USD"), Some(1));
        assert!(set.get("DOGE-USD").is_none());
        assert_eq!(set.window(0).capacity(), 10);
    }
}
