//! Driver runs the single-writer receive/aggregate loop

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::aggregation::VwapStore;
use crate::frame::FrameDecoder;
use crate::transport::Transport;
use crate::{FeedError, Result};

/// Per-message errors tolerated in a row before the driver gives up.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Rendered report snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Formatted report lines
    pub text: String,
    /// Messages aggregated when the snapshot was taken
    pub aggregated: u64,
}

/// Why the loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The peer closed the connection
    Closed,
    /// The cancellation token fired
    Cancelled,
    /// Every report receiver was dropped
    Detached,
}

/// Counters returned when the driver exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSummary {
    pub reason: StopReason,
    pub messages: u64,
    pub aggregated: u64,
}

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Latest report, `None` until the first trade is aggregated
    pub reports: watch::Receiver<Option<Arc<Report>>>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    /// Resolves once the transport has been closed
    pub handle: JoinHandle<Result<DriverSummary>>,
}

/// Driver owns the transport, decoder and store for the lifetime of a feed.
///
/// Nothing else mutates the store. Readers observe it only through the
/// report watch channel.
pub struct Driver;

impl Driver {
    /// Spawn the loop on the current runtime.
    pub fn spawn<T, S>(transport: T, decoder: FrameDecoder, store: S, with_counts: bool) -> DriverChannels
    where
        T: Transport + 'static,
        S: VwapStore + 'static,
    {
        let (report_tx, report_rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        let handle = tokio::spawn(async move {
            Self::run(transport, decoder, store, with_counts, report_tx, cancel_task).await
        });

        DriverChannels { reports: report_rx, cancel, handle }
    }

    /// Run the loop to completion.
    ///
    /// The transport is closed on every exit path. Cancellation interrupts a
    /// pending read; no bytes are lost because the decoder only buffers data
    /// from completed reads.
    pub async fn run<T, S>(
        mut transport: T,
        mut decoder: FrameDecoder,
        mut store: S,
        with_counts: bool,
        reports: watch::Sender<Option<Arc<Report>>>,
        cancel: CancellationToken,
    ) -> Result<DriverSummary>
    where
        T: Transport,
        S: VwapStore,
    {
        info!("Driver started for {} instruments", store.instruments().len());
        let mut messages = 0u64;
        let mut aggregated = 0u64;
        let mut error_count = 0u32;

        let outcome = loop {
            if cancel.is_cancelled() {
                info!("Driver cancelled");
                break Ok(StopReason::Cancelled);
            }

            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Driver cancelled during read");
                    break Ok(StopReason::Cancelled);
                }
                next = decoder.next_message(&mut transport) => next,
            };

            let applied = match next {
                Ok(Some(message)) => {
                    messages += 1;
                    store.store(&message)
                }
                Ok(None) => {
                    info!("Feed closed by peer after {} messages", messages);
                    break Ok(StopReason::Closed);
                }
                Err(e) => Err(e),
            };

            match applied {
                Ok(true) => {
                    aggregated += 1;
                    error_count = 0;
                    let report = Report { text: store.report(with_counts), aggregated };
                    trace!("Report #{}:\n{}", aggregated, report.text);
                    if reports.send(Some(Arc::new(report))).is_err() {
                        debug!("Report receivers dropped, shutting down");
                        break Ok(StopReason::Detached);
                    }
                }
                Ok(false) => {
                    error_count = 0;
                    trace!("Message {} ignored", messages);
                }
                Err(e) if e.is_per_message() => {
                    error_count += 1;
                    warn!("Skipping message ({}/{}): {}", error_count, MAX_CONSECUTIVE_ERRORS, e);
                    if error_count > MAX_CONSECUTIVE_ERRORS {
                        error!("Too many consecutive bad messages, shutting down");
                        break Err(e);
                    }
                }
                Err(e) => {
                    error!("Feed error: {}", e);
                    break Err(e);
                }
            }
        };

        if let Err(e) = transport.close().await {
            warn!("Failed to close transport: {}", e);
        }
        info!("Driver ended ({} messages, {} aggregated)", messages, aggregated);

        outcome.map(|reason| DriverSummary { reason, messages, aggregated })
    }
}

/// Wait for the driver task and flatten a join failure into [`FeedError`].
pub async fn join(handle: JoinHandle<Result<DriverSummary>>) -> Result<DriverSummary> {
    handle.await.map_err(|e| FeedError::protocol(format!("driver task failed: {}", e)))?
}
