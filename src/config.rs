//! Feed configuration
//!
//! [`FeedConfig`] is resolved once when a connection is built. Every field has
//! a default matching the public Coinbase ticker feed, so an empty YAML
//! document is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregation::DEFAULT_WINDOW_CAPACITY;
use crate::{FeedError, Result};

/// Default feed endpoint.
pub const DEFAULT_FEED_URL: &str = "wss://ws-feed.exchange.coinbase.com/";

/// Default receive chunk size for the frame decoder.
pub const DEFAULT_READ_SIZE: usize = 4096;

/// Default bound on consecutive unproductive pulls while the decoder is stalled.
pub const DEFAULT_MAX_STALLED_READS: u32 = 16;

/// Which aggregation strategy backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationStrategy {
    /// Running sums, O(1) per update
    #[default]
    Incremental,
    /// Full pass over the window on every read
    Recomputing,
}

/// Names of the JSON fields consulted on every ticker message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Field holding the message-type discriminator
    pub type_field: String,

    /// Discriminator value that marks a trade tick
    pub type_value: String,

    /// Field holding the instrument identifier
    pub instrument_field: String,

    /// Field holding the trade price
    pub price_field: String,

    /// Field holding the trade quantity
    pub quantity_field: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            type_field: "type".to_string(),
            type_value: "ticker".to_string(),
            instrument_field: "product_id".to_string(),
            price_field: "price".to_string(),
            quantity_field: "last_size".to_string(),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// WebSocket endpoint (`ws://` or `wss://`)
    pub url: String,

    /// Instruments to subscribe to and report, in report order
    pub instruments: Vec<String>,

    /// Channel name used in the subscription message
    pub channel: String,

    /// JSON field names for ticker messages
    pub fields: FieldNames,

    /// Samples kept per instrument
    pub window_capacity: usize,

    /// Aggregation strategy
    pub strategy: AggregationStrategy,

    /// Maximum bytes requested per receive
    pub read_size: usize,

    /// Consecutive stalled pulls tolerated before a protocol error
    pub max_stalled_reads: u32,

    /// Append `points:` counts to report lines
    pub point_counts: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            instruments: vec!["BTC-USD".to_string(), "ETH-USD".to_string(), "ETH-BTC".to_string()],
            channel: "ticker".to_string(),
            fields: FieldNames::default(),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            strategy: AggregationStrategy::default(),
            read_size: DEFAULT_READ_SIZE,
            max_stalled_reads: DEFAULT_MAX_STALLED_READS,
            point_counts: false,
        }
    }
}

impl FeedConfig {
    /// Parse a configuration from YAML and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FeedConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            FeedError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        crate::handshake::Endpoint::parse(&self.url)?;

        if self.instruments.is_empty() {
            return Err(FeedError::config("at least one instrument is required"));
        }
        if self.window_capacity == 0 {
            return Err(FeedError::config("window_capacity must be at least 1"));
        }
        // A zero-byte pull reads as an orderly close; anything below one frame
        // header only multiplies pulls.
        if self.read_size < 4 {
            return Err(FeedError::config("read_size must be at least 4 bytes"));
        }
        Ok(())
    }
}
