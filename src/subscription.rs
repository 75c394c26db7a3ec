//! Channel subscription message

use serde::Serialize;

use crate::config::FeedConfig;
use crate::frame::encode_text_frame;
use crate::{FeedError, Result};

/// Entry in the `channels` array: either a bare name or a name scoped to
/// specific instruments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelSpec {
    Named(String),
    Filtered { name: String, product_ids: Vec<String> },
}

/// `{"type":"subscribe","product_ids":[..],"channels":[..]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionRequest {
    #[serde(rename = "type")]
    kind: &'static str,
    pub product_ids: Vec<String>,
    pub channels: Vec<ChannelSpec>,
}

impl SubscriptionRequest {
    /// Subscribe to `heartbeat` plus `channel` for `instruments`.
    pub fn new<I, S>(instruments: I, channel: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let product_ids: Vec<String> = instruments.into_iter().map(Into::into).collect();
        let channels = vec![
            ChannelSpec::Named("heartbeat".to_string()),
            ChannelSpec::Filtered { name: channel.into(), product_ids: product_ids.clone() },
        ];
        Self { kind: "subscribe", product_ids, channels }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.instruments.iter().cloned(), config.channel.clone())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| FeedError::invalid_frame(format!("cannot serialize subscription: {}", e)))
    }

    /// Masked text frame carrying this request.
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        encode_text_frame(self.to_json()?.as_bytes())
    }
}

/// Encoded subscription frame for `config`.
pub fn subscription_frame(config: &FeedConfig) -> Result<Vec<u8>> {
    SubscriptionRequest::from_config(config).to_frame()
}
