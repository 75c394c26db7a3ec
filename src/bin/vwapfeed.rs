//! vwapfeed: print rolling VWAP reports for a market-data feed.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use vwapfeed::{AggregationStrategy, FeedConfig, ReportRate, StopReason, VwapFeed};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Incremental,
    Recomputing,
}

impl From<StrategyArg> for AggregationStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Incremental => AggregationStrategy::Incremental,
            StrategyArg::Recomputing => AggregationStrategy::Recomputing,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "vwapfeed", version)]
#[command(about = "Streaming VWAP over a WebSocket market-data feed", long_about = None)]
struct Cli {
    /// YAML configuration file; flags below override it
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Feed URL (ws:// or wss://)
    #[arg(long)]
    url: Option<String>,

    /// Instruments to track (comma-separated)
    #[arg(long = "instrument", value_delimiter = ',')]
    instruments: Vec<String>,

    /// Subscription channel
    #[arg(long)]
    channel: Option<String>,

    /// Aggregation strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Samples kept per instrument
    #[arg(long)]
    window: Option<usize>,

    /// Append point counts to each report line
    #[arg(long)]
    counts: bool,

    /// Print at most this many reports per second
    #[arg(long)]
    max_hz: Option<u32>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<FeedConfig> {
        let mut config = match &self.config {
            Some(path) => FeedConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => FeedConfig::default(),
        };

        if let Some(url) = self.url {
            config.url = url;
        }
        if !self.instruments.is_empty() {
            config.instruments = self.instruments;
        }
        if let Some(channel) = self.channel {
            config.channel = channel;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy.into();
        }
        if let Some(window) = self.window {
            config.window_capacity = window;
        }
        config.point_counts |= self.counts;

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Reports own stdout
    let base = fmt::layer().with_target(true).with_writer(std::io::stderr);

    if json {
        tracing_subscriber::registry().with(env_filter).with(base.json()).init();
    } else {
        tracing_subscriber::registry().with(env_filter).with(base).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let rate = ReportRate::from_hz(cli.max_hz);
    let config = cli.into_config()?;
    info!("Tracking {} on {}", config.instruments.join(", "), config.url);

    let connection = VwapFeed::connect(config).await.context("connecting to feed")?;

    let cancel = connection.cancel_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, shutting down");
                cancel.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let mut reports = connection.report_updates(rate);
    let mut stdout = std::io::stdout().lock();
    while let Some(report) = reports.next().await {
        write!(stdout, "{}", report.text)?;
        stdout.flush()?;
    }
    drop(stdout);

    let summary = connection.wait().await?;
    match summary.reason {
        StopReason::Closed => info!("Feed closed after {} messages", summary.messages),
        StopReason::Cancelled | StopReason::Detached => info!("Exiting"),
    }
    Ok(())
}
