//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Port the relay listens on when nothing else is configured.
pub const DEFAULT_PORT: u16 = 7777;

/// Receive buffer capacity per session, in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Lifetime handed to the notifier with every request, in milliseconds.
pub const DEFAULT_NOTIFICATION_LIFETIME_MS: u32 = 3000;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, port, socket options).
    pub listener: ListenerConfig,

    /// Per-session settings.
    pub session: SessionConfig,

    /// Accept loop error policy.
    pub accept: AcceptConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// IPv4 address to bind (e.g., "0.0.0.0").
    pub bind_address: String,

    /// TCP port. Zero asks the OS for an ephemeral port.
    pub port: u16,

    /// Enable `SO_REUSEADDR` on the listening socket.
    pub reuse_address: bool,

    /// Pending connection queue length passed to `listen(2)`.
    pub backlog: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            reuse_address: true,
            backlog: 1024,
        }
    }
}

impl ListenerConfig {
    /// The `address:port` string this listener binds to.
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capacity of the receive buffer; one read never yields more than this.
    pub buffer_size: usize,

    /// Lifetime passed to the notifier for every request.
    pub notification_lifetime_ms: u32,

    /// Close sessions that stay silent this long. `None` keeps them open forever.
    pub idle_timeout_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            notification_lifetime_ms: DEFAULT_NOTIFICATION_LIFETIME_MS,
            idle_timeout_secs: None,
        }
    }
}

/// Accept loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AcceptConfig {
    /// Base delay after the first failed accept, in milliseconds.
    pub backoff_base_ms: u64,

    /// Upper bound for the accept backoff, in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for AcceptConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 10,
            backoff_max_ms: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
