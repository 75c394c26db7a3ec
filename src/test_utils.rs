//! Test utilities: an in-memory transport and wire fixtures
//!
//! Shared by unit tests and the criterion benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::Result;
use crate::transport::Transport;

/// Minimal successful upgrade response.
pub const UPGRADE_RESPONSE: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
Sec-WebSocket-Protocol: chat\r\n\
\r\n";

/// Server-side (unmasked) text frame using the 16-bit extended length.
pub fn server_text_frame(payload: &[u8]) -> Vec<u8> {
    let len = u16::try_from(payload.len()).unwrap_or(u16::MAX);
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.push(0x81);
    frame.push(0x7E);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&payload[..len as usize]);
    frame
}

/// Ticker message in the live feed's shape, numbers as strings.
pub fn ticker_json(instrument: &str, price: &str, quantity: &str) -> String {
    serde_json::json!({
        "type": "ticker",
        "sequence": 1,
        "product_id": instrument,
        "price": price,
        "last_size": quantity,
        "side": "buy",
    })
    .to_string()
}

/// Observations that outlive a [`ScriptedTransport`] moved into a task.
#[derive(Debug, Clone, Default)]
pub struct TransportProbe {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
    receive_calls: Arc<AtomicUsize>,
}

impl TransportProbe {
    /// Every buffer passed to `send`, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }
}

/// Transport replaying a fixed byte script in chunks.
///
/// Once the script is exhausted `receive` reports an orderly close, or
/// pends forever when built with [`ScriptedTransport::hold_open`].
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Vec<u8>,
    position: usize,
    chunk_size: usize,
    hold_open: bool,
    probe: TransportProbe,
}

impl ScriptedTransport {
    pub fn new(script: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            script,
            position: 0,
            chunk_size: chunk_size.max(1),
            hold_open: false,
            probe: TransportProbe::default(),
        }
    }

    /// Keep the connection open after the script instead of closing.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn probe(&self) -> TransportProbe {
        self.probe.clone()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.probe.sent()
    }

    pub fn receive_calls(&self) -> usize {
        self.probe.receive_calls()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if let Ok(mut sent) = self.probe.sent.lock() {
            sent.push(bytes.to_vec());
        }
        Ok(())
    }

    async fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        self.probe.receive_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe.is_closed() {
            return Ok(Vec::new());
        }

        let remaining = self.script.len() - self.position;
        if remaining == 0 {
            if self.hold_open {
                std::future::pending::<()>().await;
            }
            return Ok(Vec::new());
        }

        let take = remaining.min(self.chunk_size).min(max_bytes);
        let chunk = self.script[self.position..self.position + take].to_vec();
        self.position += take;
        Ok(chunk)
    }

    async fn close(&mut self) -> Result<()> {
        self.probe.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
