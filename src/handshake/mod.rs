//! WebSocket opening handshake.
//!
//! The client sends an HTTP/1.1 `GET` with `Upgrade: websocket` and accepts
//! the connection once the server answers `HTTP/1.1 101`. Only what the feed
//! needs is implemented: no `Sec-WebSocket-Accept` verification and no
//! extension negotiation.

mod endpoint;
mod headers;
mod request;

pub use endpoint::{Endpoint, build_host_header, default_port};
pub use headers::Headers;
pub use request::{
    SUBPROTOCOLS, SWITCHING_PROTOCOLS, UpgradeResponse, WEBSOCKET_VERSION, build_upgrade_request,
    build_upgrade_request_with_nonce, generate_nonce, parse_upgrade_response, perform_handshake,
    read_upgrade_response, upgrade_headers, validate_upgrade_response,
};
