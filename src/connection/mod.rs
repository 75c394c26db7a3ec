//! Feed connection: transport, handshake, subscription and driver wired together

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::aggregation::build_store;
use crate::config::FeedConfig;
use crate::driver::{self, Driver, DriverSummary, Report};
use crate::frame::{DecoderConfig, FrameDecoder};
use crate::handshake::{Endpoint, perform_handshake};
use crate::stream::{ReportRate, ThrottleExt};
use crate::subscription::SubscriptionRequest;
use crate::transport::{TcpTransport, Transport};
use crate::{FeedError, Result};


/// Live market-data feed producing VWAP reports.
///
/// Dropping the connection cancels the driver, which closes the transport.
pub struct FeedConnection {
    /// Report watch receiver
    reports: watch::Receiver<Option<Arc<Report>>>,

    /// Cancellation token for stopping the driver
    cancel: CancellationToken,

    /// Driver task, taken by `shutdown` or `wait`
    handle: Option<JoinHandle<Result<DriverSummary>>>,

    endpoint: Endpoint,
}

impl FeedConnection {
    /// Connect over TCP (TLS for secure URLs) and start streaming.
    pub async fn connect(config: FeedConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = Endpoint::parse(&config.url)?;
        let transport = TcpTransport::connect(&endpoint).await?;
        Self::start(transport, endpoint, config).await
    }

    /// Run the feed over an already open transport.
    pub async fn with_transport<T>(transport: T, config: FeedConfig) -> Result<Self>
    where
        T: Transport + 'static,
    {
        config.validate()?;
        let endpoint = Endpoint::parse(&config.url)?;
        Self::start(transport, endpoint, config).await
    }

    async fn start<T>(mut transport: T, endpoint: Endpoint, config: FeedConfig) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let leftover = match perform_handshake(&mut transport, &endpoint).await {
            Ok(leftover) => leftover,
            Err(e) => {
                let _ = transport.close().await;
                return Err(e);
            }
        };

        let subscription = SubscriptionRequest::from_config(&config);
        debug!("Subscribing to '{}' for {:?}", config.channel, subscription.product_ids);
        if let Err(e) = send_subscription(&mut transport, &subscription).await {
            let _ = transport.close().await;
            return Err(e);
        }

        let decoder_config =
            DecoderConfig { read_size: config.read_size, max_stalled_reads: config.max_stalled_reads };
        let decoder = FrameDecoder::with_initial_bytes(decoder_config, &leftover);
        let store = build_store(&config);

        let channels = Driver::spawn(transport, decoder, store, config.point_counts);

        info!(
            "Streaming {} instruments from {} ({:?} aggregation)",
            config.instruments.len(),
            endpoint,
            config.strategy
        );

        Ok(Self {
            reports: channels.reports,
            cancel: channels.cancel,
            handle: Some(channels.handle),
            endpoint,
        })
    }

    /// Stream of report snapshots.
    ///
    /// Yields the current report first if one exists, then each new one. The
    /// stream ends when the driver exits.
    pub fn report_updates(&self, rate: ReportRate) -> BoxStream<'static, Arc<Report>> {
        let reports = WatchStream::new(self.reports.clone()).filter_map(|opt| async move { opt });

        match rate.period() {
            None => reports.boxed(),
            Some(period) => reports.throttle(period).boxed(),
        }
    }

    /// Formatted report text as a stream, for printing.
    pub fn report_text(&self, rate: ReportRate) -> impl Stream<Item = String> + 'static {
        self.report_updates(rate).map(|report| report.text.clone())
    }

    /// Most recent report, if any trade has been aggregated.
    pub fn latest_report(&self) -> Option<Arc<Report>> {
        self.reports.borrow().clone()
    }

    /// Token that stops the driver when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Cancel the driver and wait for it to close the transport.
    pub async fn shutdown(mut self) -> Result<DriverSummary> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the driver to finish on its own (peer close, error or an
    /// external cancel through [`FeedConnection::cancel_token`]).
    pub async fn wait(mut self) -> Result<DriverSummary> {
        self.join().await
    }

    async fn join(&mut self) -> Result<DriverSummary> {
        match self.handle.take() {
            Some(handle) => driver::join(handle).await,
            None => Err(FeedError::protocol("driver already joined")),
        }
    }
}

impl Drop for FeedConnection {
    fn drop(&mut self) {
        debug!("Dropping feed connection to {}", self.endpoint);
        self.cancel.cancel();
    }
}

async fn send_subscription<T>(transport: &mut T, subscription: &SubscriptionRequest) -> Result<()>
where
    T: Transport + ?Sized,
{
    let frame = subscription.to_frame()?;
    transport.send(&frame).await
}
