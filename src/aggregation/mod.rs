//! Sliding-window VWAP aggregation.
//!
//! Two stores implement [`VwapStore`]:
//!
//! - [`RecomputingStore`] walks the whole window on every read
//! - [`IncrementalStore`] keeps running sums and updates them in O(1)
//!
//! Both produce the same reports for the same input, which the differential
//! tests below check.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use vwapfeed::aggregation::{IncrementalStore, VwapStore};
//! use vwapfeed::config::FieldNames;
//!
//! let fields = FieldNames { type_value: "match".into(), ..FieldNames::default() };
//! let mut store = IncrementalStore::new(["ETH-BTC"], fields, 200);
//!
//! store.store(&json!({"type": "match", "product_id": "ETH-BTC", "price": 2.0, "last_size": 1.0}))?;
//! assert_eq!(store.report(false), "ETH-BTC\t002.000000\n");
//! # Ok::<(), vwapfeed::FeedError>(())
//! ```

mod incremental;
mod recomputing;
mod ticker;
mod window;

pub use incremental::IncrementalStore;
pub use recomputing::RecomputingStore;
pub use ticker::extract_trade;
pub use window::{Sample, SampleWindow, WindowSet};

use serde_json::Value;

use crate::Result;
use crate::config::{AggregationStrategy, FeedConfig};

/// Samples kept per instrument unless configured otherwise.
pub const DEFAULT_WINDOW_CAPACITY: usize = 200;

/// Capability shared by the aggregation strategies.
pub trait VwapStore: Send {
    /// Apply one feed message.
    ///
    /// Returns `Ok(true)` when the message was a trade for a configured
    /// instrument, `Ok(false)` when it was ignored.
    fn store(&mut self, message: &Value) -> Result<bool>;

    /// Configured instruments in report order.
    fn instruments(&self) -> &[String];

    /// Current VWAP for `instrument`, `None` if it is not configured.
    fn vwap(&self, instrument: &str) -> Option<f64>;

    /// Samples currently held for `instrument`.
    fn points(&self, instrument: &str) -> Option<usize>;

    /// Render one line per instrument.
    fn report(&self, with_counts: bool) -> String {
        crate::report::render(self, with_counts)
    }
}

impl<S: VwapStore + ?Sized> VwapStore for Box<S> {
    fn store(&mut self, message: &Value) -> Result<bool> {
        (**self).store(message)
    }

    fn instruments(&self) -> &[String] {
        (**self).instruments()
    }

    fn vwap(&self, instrument: &str) -> Option<f64> {
        (**self).vwap(instrument)
    }

    fn points(&self, instrument: &str) -> Option<usize> {
        (**self).points(instrument)
    }

    fn report(&self, with_counts: bool) -> String {
        (**self).report(with_counts)
    }
}

/// Build the store selected by `config.strategy`.
pub fn build_store(config: &FeedConfig) -> Box<dyn VwapStore> {
    let instruments = config.instruments.iter().cloned();
    let fields = config.fields.clone();
    match config.strategy {
        AggregationStrategy::Incremental => {
            Box::new(IncrementalStore::new(instruments, fields, config.window_capacity))
        }
        AggregationStrategy::Recomputing => {
            Box::new(RecomputingStore::new(instruments, fields, config.window_capacity))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldNames;
    use proptest::prelude::*;
    use serde_json::json;

    fn match_fields() -> FieldNames {
        FieldNames {
            type_value: "match".into(),
            quantity_field: "quantity".into(),
            ..FieldNames::default()
        }
    }

    fn stores(capacity: usize) -> (RecomputingStore, IncrementalStore) {
        let instruments = ["BTC-USD", "ETH-USD", "ETH-BTC"];
        (
            RecomputingStore::new(instruments, match_fields(), capacity),
            IncrementalStore::new(instruments, match_fields(), capacity),
        )
    }

    fn tick(instrument: &str, price: f64, quantity: f64) -> Value {
        json!({"type": "match", "product_id": instrument, "price": price, "quantity": quantity})
    }

    #[test]
    fn eth_btc_scenario_matches_expected_report() {
        let (mut slow, mut fast) = stores(DEFAULT_WINDOW_CAPACITY);
        let ticks = [(0.05478, 0.072342), (0.04478, 0.042342), (0.03478, 0.042342)];

        for (price, quantity) in ticks {
            assert!(slow.store(&tick("ETH-BTC", price, quantity)).unwrap());
            assert!(fast.store(&tick("ETH-BTC", price, quantity)).unwrap());
        }

        let expected = "BTC-USD\t000.000000\nETH-USD\t000.000000\nETH-BTC\t000.046691\n";
        assert_eq!(slow.report(false), expected);
        assert_eq!(fast.report(false), expected);
    }

    #[test]
    fn fresh_default_store_reports_zeros() {
        let store = build_store(&FeedConfig::default());
        assert_eq!(
            store.report(false),
            "BTC-USD\t000.000000\nETH-USD\t000.000000\nETH-BTC\t000.000000\n"
        );
        assert_eq!(
            store.report(true),
            "BTC-USD\t000.000000\tpoints:\t0\n\
             ETH-USD\t000.000000\tpoints:\t0\n\
             ETH-BTC\t000.000000\tpoints:\t0\n"
        );
    }

    #[test]
    fn filtering_drops_foreign_types_and_instruments() {
        let (mut slow, mut fast) = stores(DEFAULT_WINDOW_CAPACITY);
        let ignored = [
            json!({"type": "ticker", "product_id": "ETH-BTC", "price": 1.0, "quantity": 1.0}),
            tick("DOGE-USD", 1.0, 1.0),
            json!({"type": "subscriptions", "channels": []}),
        ];

        for message in &ignored {
            assert!(!slow.store(message).unwrap());
            assert!(!fast.store(message).unwrap());
        }
        assert_eq!(slow.points("ETH-BTC"), Some(0));
        assert_eq!(fast.points("ETH-BTC"), Some(0));
        assert_eq!(fast.vwap("DOGE-USD"), None);
    }

    #[test]
    fn window_caps_at_capacity_in_both_stores() {
        let (mut slow, mut fast) = stores(DEFAULT_WINDOW_CAPACITY);
        for i in 0..=DEFAULT_WINDOW_CAPACITY {
            let message = tick("BTC-USD", 100.0 + i as f64, 1.0);
            slow.store(&message).unwrap();
            fast.store(&message).unwrap();
        }

        assert_eq!(slow.points("BTC-USD"), Some(200));
        assert_eq!(fast.points("BTC-USD"), Some(200));
        // First tick (price 100) evicted: mean of 101..=300
        assert!((fast.vwap("BTC-USD").unwrap() - 200.5).abs() < 1e-9);
        assert_eq!(slow.report(true), fast.report(true));
    }

    #[test]
    fn invalid_trade_is_reported_and_not_stored() {
        let (_, mut fast) = stores(DEFAULT_WINDOW_CAPACITY);
        let bad = json!({"type": "match", "product_id": "ETH-BTC", "price": "n/a", "quantity": 1});
        assert!(fast.store(&bad).is_err());
        assert_eq!(fast.points("ETH-BTC"), Some(0));
    }

    #[test]
    fn strategy_selects_implementation() {
        let config = FeedConfig { strategy: AggregationStrategy::Recomputing, ..FeedConfig::default() };
        let mut store = build_store(&config);
        let message = json!({"type": "ticker", "product_id": "ETH-USD", "price": "10", "last_size": "2"});
        assert!(store.store(&message).unwrap());
        assert_eq!(store.vwap("ETH-USD"), Some(10.0));
    }

    proptest! {
        #[test]
        fn incremental_tracks_recomputed_vwap(
            ticks in prop::collection::vec(
                (0usize..3, 1.0f64..10_000.0, prop_oneof![1 => Just(0.0f64), 4 => 0.01f64..100.0]),
                1..600,
            ),
            capacity in 1usize..250,
        ) {
            let (mut slow, mut fast) = stores(capacity);
            let names = ["BTC-USD", "ETH-USD", "ETH-BTC"];

            for (which, price, quantity) in ticks {
                let message = tick(names[which], price, quantity);
                slow.store(&message).unwrap();
                fast.store(&message).unwrap();

                for name in names {
                    let expected = slow.vwap(name).unwrap();
                    let actual = fast.vwap(name).unwrap();
                    let tolerance = 1e-4_f64.max(1e-9 * expected.abs());
                    prop_assert!(
                        (expected - actual).abs() <= tolerance,
                        "{}: recomputed {} vs incremental {}", name, expected, actual
                    );
                    prop_assert_eq!(slow.points(name), fast.points(name));
                    prop_assert!(fast.points(name).unwrap() <= capacity);
                }
            }
        }
    }
}
