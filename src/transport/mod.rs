//! Byte-level transport abstraction
//!
//! The handshake and frame decoder only need to send bytes and pull bytes.
//! Keeping that behind a trait lets the same pipeline run over TCP, TLS or
//! an in-memory script in tests.

mod tcp;

pub use tcp::TcpTransport;

use crate::Result;

/// Trait for byte-stream connections
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Write all of `bytes`.
    async fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read up to `max_bytes`.
    ///
    /// Returns:
    /// - a non-empty buffer when data arrived
    /// - an empty buffer on orderly close
    /// - `Err(e)` on I/O failure
    ///
    /// Implementations must be cancel-safe: dropping the future before it
    /// completes must not lose bytes.
    async fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>>;

    /// Shut the connection down. Further receives return empty buffers.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes).await
    }

    async fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        (**self).receive(max_bytes).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}
