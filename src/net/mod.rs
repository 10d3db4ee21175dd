//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, closed on shutdown)
//!     → session.rs (peer address, read → notify → echo loop)
//!     → registry.rs (live set, stop on disconnect or shutdown)
//!
//! Session States:
//!     Accepted → Reading ⇄ Replying → Closed
//! ```
//!
//! # Design Decisions
//! - One read is one request; there is no framing beyond the buffer size
//! - Each session is tracked so shutdown can close it
//! - Stopping a session is idempotent and cancels its pending read or write

pub mod listener;
pub mod registry;
pub mod session;

pub use listener::{Listener, ListenerError};
pub use registry::SessionRegistry;
pub use session::{extract_message, Session, SessionHandle, SessionId};
