//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (buffer sizes, lifetimes, backoff bounds)
//! - Check that addresses parse before anything tries to bind them
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{Ipv4Addr, SocketAddr};

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// Largest receive buffer a session may allocate.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not an IPv4 address")]
    BindAddress(String),

    #[error("session.buffer_size must be between 1 and {max}, got {got}")]
    BufferSize { got: usize, max: usize },

    #[error("session.notification_lifetime_ms must be greater than zero")]
    NotificationLifetime,

    #[error("session.idle_timeout_secs must be greater than zero when set")]
    IdleTimeout,

    #[error("accept.backoff_base_ms ({base}) exceeds accept.backoff_max_ms ({max})")]
    Backoff { base: u64, max: u64 },

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<Ipv4Addr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let buffer_size = config.session.buffer_size;
    if buffer_size == 0 || buffer_size > MAX_BUFFER_SIZE {
        errors.push(ValidationError::BufferSize {
            got: buffer_size,
            max: MAX_BUFFER_SIZE,
        });
    }

    if config.session.notification_lifetime_ms == 0 {
        errors.push(ValidationError::NotificationLifetime);
    }

    if config.session.idle_timeout_secs == Some(0) {
        errors.push(ValidationError::IdleTimeout);
    }

    if config.accept.backoff_base_ms > config.accept.backoff_max_ms {
        errors.push(ValidationError::Backoff {
            base: config.accept.backoff_base_ms,
            max: config.accept.backoff_max_ms,
        });
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
