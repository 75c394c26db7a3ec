//! Ordered, multi-valued, case-insensitive HTTP header collection

use std::collections::HashMap;
use std::fmt;

use crate::{FeedError, Result};

/// HTTP headers in insertion order.
///
/// Names keep their original spelling for serialization. Lookups go through a
/// lowercased index that maps each name to every value stored under it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
    index: HashMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header. Existing values under the same name are kept.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.index.entry(name.to_ascii_lowercase()).or_default().push(value.clone());
        self.entries.push((name, value));
    }

    /// Single-valued lookup.
    ///
    /// Fails when the name is absent or carries more than one value.
    pub fn get(&self, name: &str) -> Result<&str> {
        match self.index.get(&name.to_ascii_lowercase()).map(Vec::as_slice) {
            Some([value]) => Ok(value.as_str()),
            Some(values) if values.len() > 1 => Err(FeedError::handshake_failed(format!(
                "header '{}' has {} values",
                name,
                values.len()
            ))),
            _ => Err(FeedError::handshake_failed(format!("header '{}' not present", name))),
        }
    }

    /// All values stored under `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.index.get(&name.to_ascii_lowercase()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    /// Remove every value stored under `name`.
    pub fn remove(&mut self, name: &str) {
        let key = name.to_ascii_lowercase();
        if self.index.remove(&key).is_some() {
            self.entries.retain(|(n, _)| n.to_ascii_lowercase() != key);
        }
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Wire form: one `Name: value\r\n` line per entry, then a blank line.
    pub fn serialize(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{}: {}\r\n", name, value)?;
        }
        f.write_str("\r\n")
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Sec-WebSocket-Version", "13");

        assert_eq!(headers.get("sec-websocket-version").unwrap(), "13");
        assert_eq!(headers.get("SEC-WEBSOCKET-VERSION").unwrap(), "13");
        assert!(headers.contains("Sec-Websocket-Version"));
    }

    #[test]
    fn single_lookup_fails_on_missing_or_repeated_names() {
        let mut headers = Headers::new();
        headers.insert("Set-Cookie", "a=1");
        headers.insert("set-cookie", "b=2");

        assert!(headers.get("Host").is_err());
        assert!(headers.get("Set-Cookie").is_err());
        assert_eq!(headers.get_all("SET-COOKIE"), ["a=1", "b=2"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn serialization_keeps_order_and_spelling() {
        let headers: Headers =
            [("Host", "example.com"), ("Upgrade", "websocket"), ("Connection", "Upgrade")]
                .into_iter()
                .collect();

        assert_eq!(
            headers.to_string(),
            "Host: example.com\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n"
        );
    }

    #[test]
    fn remove_drops_all_spellings() {
        let mut headers = Headers::new();
        headers.insert("X-Trace", "1");
        headers.insert("Host", "example.com");
        headers.insert("x-trace", "2");

        headers.remove("X-TRACE");

        assert!(!headers.contains("x-trace"));
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec![("Host", "example.com")]);
        assert_eq!(headers.serialize(), b"Host: example.com\r\n\r\n");
    }
}
