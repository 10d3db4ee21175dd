//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Parse flags → Load config → Apply overrides → Validate
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Server shutdown path
//!
//! Shutdown (shutdown.rs):
//!     trigger() → same path as a signal
//!     → Close listener → Stop all sessions → Exit callback
//! ```
//!
//! # Design Decisions
//! - Signal handlers are registered before the listener is bound
//! - Shutdown is one-shot; the server exits after the first trigger

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::TerminationSignal;
