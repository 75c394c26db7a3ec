//! Connection parameters derived from a feed URL

use std::fmt;

use url::{Host, Url};

use crate::{FeedError, Result};

/// Parsed connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// TLS is required (`wss`/`https`)
    pub secure: bool,

    /// Host name or IP literal, without IPv6 brackets
    pub host: String,

    /// Explicit port, or the scheme default
    pub port: u16,

    /// Request target: path plus `?query`
    pub resource: String,

    is_ipv6: bool,
}

impl Endpoint {
    /// Parse a `ws`, `wss`, `http` or `https` URL.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;

        let secure = match parsed.scheme() {
            "wss" | "https" => true,
            "ws" | "http" => false,
            other => {
                return Err(FeedError::config(format!("unsupported URL scheme '{}'", other)));
            }
        };

        let (host, is_ipv6) = match parsed.host() {
            Some(Host::Domain(domain)) => (domain.to_string(), false),
            Some(Host::Ipv4(addr)) => (addr.to_string(), false),
            Some(Host::Ipv6(addr)) => (addr.to_string(), true),
            None => return Err(FeedError::config(format!("URL '{}' has no host", url))),
        };

        let port = parsed.port().unwrap_or_else(|| default_port(secure));

        let mut resource = match parsed.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };
        if let Some(query) = parsed.query() {
            resource.push('?');
            resource.push_str(query);
        }

        Ok(Self { secure, host, port, resource, is_ipv6 })
    }

    /// Value for the `Host` request header.
    pub fn host_header(&self) -> String {
        build_host_header(&self.host, self.port, self.secure)
    }

    /// Whether the host is an IPv6 literal.
    pub fn is_ipv6(&self) -> bool {
        self.is_ipv6
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "wss" } else { "ws" };
        let host = if self.is_ipv6 { format!("[{}]", self.host) } else { self.host.clone() };
        write!(f, "{}://{}:{}{}", scheme, host, self.port, self.resource)
    }
}

/// Port implied by the scheme.
pub fn default_port(secure: bool) -> u16 {
    if secure { 443 } else { 80 }
}

/// Build a `Host` header value.
///
/// The port is omitted when it equals the scheme default. IPv6 literals are
/// bracketed (RFC 3986 §3.2.2).
pub fn build_host_header(host: &str, port: u16, secure: bool) -> String {
    let mut value = match host.parse::<std::net::IpAddr>() {
        Ok(std::net::IpAddr::V6(_)) => format!("[{}]", host),
        _ => host.to_string(),
    };

    if port != default_port(secure) {
        value.push(':');
        value.push_str(&port.to_string());
    }

    value
}
