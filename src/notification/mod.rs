//! Notification dispatch.
//!
//! # Data Flow
//! ```text
//! Session read completes
//!     → extract request text
//!     → Notifier::notify(message, lifetime_ms)   (synchronous, on the reactor)
//!     → presentation layer (outside this crate)
//! ```
//!
//! # Design Decisions
//! - The server receives its notifier at construction; there is no
//!   set-before-first-message ordering to get wrong
//! - hook.rs keeps a process-wide slot for owners that wire the presenter
//!   after the server is built; it rejects messages while empty
//! - Notifiers run on the reactor and must not block

pub mod hook;

use thiserror::Error;

pub use hook::{clear_notification_callback, set_notification_callback, GlobalHook};

/// Errors reported by a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The process-wide slot was invoked before a callback was installed.
    #[error("no notification callback installed")]
    CallbackUnset,
}

/// Receiver for every request a session parses.
pub trait Notifier: Send + Sync + 'static {
    /// Present `message` for `lifetime_ms` milliseconds.
    fn notify(&self, message: &str, lifetime_ms: u32) -> Result<(), NotifyError>;
}

impl<F> Notifier for F
where
    F: Fn(&str, u32) + Send + Sync + 'static,
{
    fn notify(&self, message: &str, lifetime_ms: u32) -> Result<(), NotifyError> {
        self(message, lifetime_ms);
        Ok(())
    }
}

/// Notifier that only records the request in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, lifetime_ms: u32) -> Result<(), NotifyError> {
        tracing::info!(message = %message, lifetime_ms, "Notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn closures_are_notifiers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let notifier: Arc<dyn Notifier> = Arc::new(move |msg: &str, lifetime: u32| {
            sink.lock().unwrap().push((msg.to_string(), lifetime));
        });

        notifier.notify("disk almost full", 3000).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![("disk almost full".to_string(), 3000)]);
    }

    #[test]
    fn log_notifier_accepts_everything() {
        assert_eq!(LogNotifier.notify("", 1), Ok(()));
    }
}
