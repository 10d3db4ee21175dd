//! Notice relay library: a TCP front end that raises each request as a
//! notification and echoes it back to the sender.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod notification;
pub mod observability;
pub mod resilience;
pub mod server;

pub use config::ServerConfig;
pub use lifecycle::Shutdown;
pub use notification::{Notifier, NotifyError};
pub use server::{Server, ServerError, ShutdownReason};
