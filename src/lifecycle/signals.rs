//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers when the server is bound
//! - Resolve once the first of them is delivered
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are installed before any socket I/O, so a signal delivered
//!   before `run()` starts is still observed
//! - One-shot: the server does not wait for a second signal

use std::fmt;
use std::io;

/// The termination signal that was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Registered interest in the process termination signals.
#[cfg(unix)]
#[derive(Debug)]
pub struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    /// Install the handlers. Must be called from inside a Tokio runtime.
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next SIGINT or SIGTERM.
    pub async fn recv(&mut self) -> TerminationSignal {
        tokio::select! {
            _ = self.interrupt.recv() => TerminationSignal::Interrupt,
            _ = self.terminate.recv() => TerminationSignal::Terminate,
        }
    }
}

/// Registered interest in the process termination signals.
#[cfg(not(unix))]
#[derive(Debug)]
pub struct TerminationSignals {
    _private: (),
}

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn register() -> io::Result<Self> {
        Ok(Self { _private: () })
    }

    /// Wait for Ctrl-C, the only termination signal available here.
    pub async fn recv(&mut self) -> TerminationSignal {
        match tokio::signal::ctrl_c().await {
            Ok(()) => TerminationSignal::Interrupt,
            Err(e) => {
                tracing::error!(error = %e, "Ctrl-C handler failed; signal shutdown disabled");
                std::future::pending().await
            }
        }
    }
}
