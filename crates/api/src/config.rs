//! Runtime configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Settings handed to [`crate::Minuscule`] at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    /// Compact logs without error traces.
    pub production: bool,
    pub bind_addr: SocketAddr,
    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            production: false,
            bind_addr: DEFAULT_BIND_ADDR,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl WebConfig {
    /// Read `ENV`, `BIND_ADDR` and `BODY_LIMIT` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let production = lookup("ENV").is_some_and(|env| env == "production");

        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, default = %DEFAULT_BIND_ADDR, "invalid BIND_ADDR; using default");
                defaults.bind_addr
            }),
            None => defaults.bind_addr,
        };

        let body_limit = match lookup("BODY_LIMIT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, default = DEFAULT_BODY_LIMIT, "invalid BODY_LIMIT; using default");
                defaults.body_limit
            }),
            None => defaults.body_limit,
        };

        Self {
            production,
            bind_addr,
            body_limit,
        }
    }
}
