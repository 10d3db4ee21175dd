//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Server, registry and sessions produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout via the fmt layer
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Every log line carries the session id and peer when one exists
//! - Metrics are cheap (atomic increments) and off by default

pub mod logging;
pub mod metrics;
