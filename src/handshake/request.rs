//! HTTP upgrade request and response handling

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, trace};

use super::endpoint::Endpoint;
use super::headers::Headers;
use crate::transport::Transport;
use crate::{FeedError, Result};

/// Subprotocols offered during the upgrade.
pub const SUBPROTOCOLS: &str = "chat, superchat";

/// WebSocket protocol version sent in the upgrade.
pub const WEBSOCKET_VERSION: &str = "13";

/// Status line prefix that marks a successful upgrade.
pub const SWITCHING_PROTOCOLS: &[u8] = b"HTTP/1.1 101";

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const MAX_RESPONSE_HEAD: usize = 16 * 1024;
const RESPONSE_READ_SIZE: usize = 1024;

/// Fresh `Sec-WebSocket-Key`: 16 random bytes, base64 encoded.
pub fn generate_nonce() -> String {
    let bytes: [u8; 16] = rand::random();
    STANDARD.encode(bytes)
}

/// Header block for the upgrade request, in wire order.
pub fn upgrade_headers(endpoint: &Endpoint, nonce: &str) -> Headers {
    let mut headers = Headers::new();
    headers.insert("Host", endpoint.host_header());
    headers.insert("Upgrade", "websocket");
    headers.insert("Connection", "Upgrade");
    headers.insert("Sec-WebSocket-Key", nonce);
    headers.insert("Sec-WebSocket-Protocol", SUBPROTOCOLS);
    headers.insert("Sec-WebSocket-Version", WEBSOCKET_VERSION);
    headers
}

/// Raw upgrade request bytes for `url` with a freshly generated nonce.
pub fn build_upgrade_request(url: &str) -> Result<Vec<u8>> {
    let endpoint = Endpoint::parse(url)?;
    Ok(build_upgrade_request_with_nonce(&endpoint, &generate_nonce()))
}

/// Raw upgrade request bytes with a caller-supplied nonce.
pub fn build_upgrade_request_with_nonce(endpoint: &Endpoint, nonce: &str) -> Vec<u8> {
    let mut request = format!("GET {} HTTP/1.1\r\n", endpoint.resource).into_bytes();
    request.extend_from_slice(&upgrade_headers(endpoint, nonce).serialize());
    request
}

/// Accept a response only if it carries the `HTTP/1.1 101` status line.
pub fn validate_upgrade_response(response: &[u8]) -> Result<()> {
    if find(response, SWITCHING_PROTOCOLS).is_some() {
        Ok(())
    } else {
        let status = response.split(|&b| b == b'\n').next().unwrap_or_default();
        Err(FeedError::handshake_failed(format!(
            "expected '101 Switching Protocols', got '{}'",
            String::from_utf8_lossy(status).trim_end()
        )))
    }
}

/// Parsed upgrade response head.
#[derive(Debug, Clone)]
pub struct UpgradeResponse {
    pub status_line: String,
    pub headers: Headers,
}

/// Split a response head into its status line and headers.
///
/// Header lines without a colon are ignored.
pub fn parse_upgrade_response(head: &[u8]) -> UpgradeResponse {
    let text = String::from_utf8_lossy(head);
    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap_or_default().to_string();

    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    UpgradeResponse { status_line, headers }
}

/// Pull from `transport` until the response head is complete.
///
/// Returns the head (terminator included) and whatever bytes followed it in
/// the same reads. Those bytes already belong to the frame stream.
pub async fn read_upgrade_response<T>(transport: &mut T) -> Result<(Vec<u8>, Vec<u8>)>
where
    T: Transport + ?Sized,
{
    let mut buffer = Vec::with_capacity(RESPONSE_READ_SIZE);

    loop {
        if let Some(pos) = find(&buffer, HEADER_TERMINATOR) {
            let leftover = buffer.split_off(pos + HEADER_TERMINATOR.len());
            trace!("Upgrade response head {} bytes, {} trailing", buffer.len(), leftover.len());
            return Ok((buffer, leftover));
        }

        if buffer.len() > MAX_RESPONSE_HEAD {
            return Err(FeedError::handshake_failed(format!(
                "response head exceeds {} bytes",
                MAX_RESPONSE_HEAD
            )));
        }

        let chunk = transport.receive(RESPONSE_READ_SIZE).await?;
        if chunk.is_empty() {
            return Err(FeedError::handshake_failed(
                "connection closed before upgrade response completed",
            ));
        }
        buffer.extend_from_slice(&chunk);
    }
}

/// Run the full upgrade exchange on an open transport.
///
/// Returns bytes received after the response head.
pub async fn perform_handshake<T>(transport: &mut T, endpoint: &Endpoint) -> Result<Vec<u8>>
where
    T: Transport + ?Sized,
{
    let request = build_upgrade_request_with_nonce(endpoint, &generate_nonce());
    debug!("Sending upgrade request to {}", endpoint);
    trace!("{}", String::from_utf8_lossy(&request));
    transport.send(&request).await?;

    let (head, leftover) = read_upgrade_response(transport).await?;
    validate_upgrade_response(&head)?;

    let response = parse_upgrade_response(&head);
    debug!(
        "Switched to WebSocket: {} (protocol={:?})",
        response.status_line,
        response.headers.get("Sec-WebSocket-Protocol").ok()
    );

    Ok(leftover)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
