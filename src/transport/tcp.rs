//! TCP transport with optional TLS

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_native_tls::TlsStream;
use tokio_native_tls::native_tls;
use tracing::{debug, info};

use super::Transport;
use crate::handshake::Endpoint;
use crate::{FeedError, Result};

enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Closed,
}

/// Transport over a TCP socket, TLS-wrapped for secure endpoints.
pub struct TcpTransport {
    stream: Stream,
    peer: String,
}

impl TcpTransport {
    /// Open a connection to `endpoint`.
    ///
    /// Secure endpoints are wrapped in TLS and verified against the host name.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let peer = format!("{}:{}", endpoint.host, endpoint.port);
        info!("Connecting to {}", endpoint);

        let tcp = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| FeedError::connection_failed_with_source(peer.clone(), Box::new(e)))?;
        tcp.set_nodelay(true).map_err(|e| FeedError::transport("set_nodelay", e))?;

        let stream = if endpoint.secure {
            let connector = native_tls::TlsConnector::new()
                .map_err(|e| FeedError::connection_failed_with_source(peer.clone(), Box::new(e)))?;
            let connector = tokio_native_tls::TlsConnector::from(connector);
            let tls = connector
                .connect(&endpoint.host, tcp)
                .await
                .map_err(|e| FeedError::connection_failed_with_source(peer.clone(), Box::new(e)))?;
            debug!("TLS session established with {}", endpoint.host);
            Stream::Tls(Box::new(tls))
        } else {
            Stream::Plain(tcp)
        };

        Ok(Self { stream, peer })
    }

    /// Remote `host:port`.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

async fn read_chunk<S: AsyncRead + Unpin>(stream: &mut S, max_bytes: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; max_bytes];
    let n = stream.read(&mut buf).await.map_err(|e| FeedError::transport("receive", e))?;
    buf.truncate(n);
    Ok(buf)
}

async fn write_all<S: AsyncWrite + Unpin>(stream: &mut S, bytes: &[u8]) -> Result<()> {
    stream.write_all(bytes).await.map_err(|e| FeedError::transport("send", e))?;
    stream.flush().await.map_err(|e| FeedError::transport("flush", e))
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.stream {
            Stream::Plain(s) => write_all(s, bytes).await,
            Stream::Tls(s) => write_all(s.as_mut(), bytes).await,
            Stream::Closed => Err(FeedError::transport(
                "send",
                std::io::Error::new(std::io::ErrorKind::NotConnected, "transport closed"),
            )),
        }
    }

    async fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        match &mut self.stream {
            Stream::Plain(s) => read_chunk(s, max_bytes).await,
            Stream::Tls(s) => read_chunk(s.as_mut(), max_bytes).await,
            Stream::Closed => Ok(Vec::new()),
        }
    }

    async fn close(&mut self) -> Result<()> {
        let result = match &mut self.stream {
            Stream::Plain(s) => s.shutdown().await,
            Stream::Tls(s) => s.shutdown().await,
            Stream::Closed => return Ok(()),
        };
        self.stream = Stream::Closed;
        debug!("Closed connection to {}", self.peer);
        // A peer that already hung up makes shutdown fail; the socket is gone either way.
        if let Err(e) = result {
            debug!("Shutdown of {} reported: {}", self.peer, e);
        }
        Ok(())
    }
}
