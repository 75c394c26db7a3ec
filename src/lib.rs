//! Streaming VWAP over a real-time market-data feed.
//!
//! vwapfeed opens a WebSocket connection with its own minimal engine,
//! subscribes to a ticker channel, and keeps a sliding-window volume-weighted
//! average price per instrument.
//!
//! # Features
//!
//! - **Minimal WebSocket engine**: upgrade handshake, masked frame encoder and
//!   a pull-based frame decoder that tolerates split reads
//! - **Two aggregation strategies**: full recompute or O(1) running sums,
//!   interchangeable behind [`aggregation::VwapStore`]
//! - **Async streaming**: reports published on a watch channel and exposed as
//!   optionally throttled streams
//! - **Clean shutdown**: a cancellation token interrupts pending reads
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use vwapfeed::{FeedConfig, ReportRate, VwapFeed};
//!
//! #[tokio::main]
//! async fn main() -> vwapfeed::Result<()> {
//!     let connection = VwapFeed::connect(FeedConfig::default()).await?;
//!     let mut reports = connection.report_updates(ReportRate::Max(2));
//!
//!     while let Some(report) = reports.next().await {
//!         print!("{}", report.text);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

// Wire layer
pub mod frame;
pub mod handshake;
pub mod subscription;
pub mod transport;

// Aggregation and output
pub mod aggregation;
pub mod report;

// Runtime
pub mod config;
pub mod connection;
pub mod driver;
pub mod stream;

// Core exports
pub use error::*;

// Main API exports
pub use aggregation::{IncrementalStore, RecomputingStore, VwapStore};
pub use config::{AggregationStrategy, FeedConfig, FieldNames};
pub use connection::FeedConnection;
pub use driver::{Report, StopReason};
pub use stream::ReportRate;

/// Entry point for feed connections.
///
/// # Examples
///
/// ```rust,no_run
/// use vwapfeed::{FeedConfig, VwapFeed};
///
/// # #[tokio::main]
/// # async fn main() -> vwapfeed::Result<()> {
/// let config = FeedConfig::load("feed.yaml")?;
/// let connection = VwapFeed::connect(config).await?;
/// # Ok(())
/// # }
/// ```
pub struct VwapFeed;

impl VwapFeed {
    /// Connect to the configured feed and start aggregating.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The host cannot be reached or TLS fails
    /// - The server refuses the WebSocket upgrade
    pub async fn connect(config: FeedConfig) -> Result<FeedConnection> {
        FeedConnection::connect(config).await
    }

    /// Load a YAML configuration file and connect.
    pub async fn open<P: AsRef<std::path::Path>>(path: P) -> Result<FeedConnection> {
        FeedConnection::connect(FeedConfig::load(path)?).await
    }
}
