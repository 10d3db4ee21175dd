//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Accept fails (e.g. file descriptors exhausted):
//!     → backoff.rs (consecutive failure count → delay)
//!     → accept loop waits, unless shutdown arrives first
//!     → next successful accept resets the count
//! ```
//!
//! # Design Decisions
//! - Accept errors never stop the server; they only slow the loop down
//! - Jitter keeps several relays on one host from retrying in lockstep

pub mod backoff;
