//! The relay server: accept loop, session tasks and signal-driven shutdown.
//!
//! # Responsibilities
//! - Register for SIGINT/SIGTERM, then bind the listener
//! - Accept connections and hand each one to the registry as a session
//! - Back off on repeated accept failures
//! - On the first termination signal: close the listener, stop every
//!   session, wait for their tasks, invoke the exit callback
//!
//! # Design Decisions
//! - Exactly one accept is pending while the listener is open
//! - Shutdown is one-shot; a second signal is not waited for
//! - `run` returns only after every session task has finished

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

use crate::config::{AcceptConfig, ServerConfig};
use crate::lifecycle::signals::{TerminationSignal, TerminationSignals};
use crate::lifecycle::Shutdown;
use crate::net::{Listener, ListenerError, Session, SessionRegistry};
use crate::notification::Notifier;
use crate::observability::metrics;
use crate::resilience::backoff::AcceptBackoff;

/// Errors raised while constructing the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound or put into listen mode.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Listener(ListenerError),

    #[error("Failed to register signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

/// What ended a server run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(TerminationSignal),
    /// [`Shutdown::trigger`] was called.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(signal) => write!(f, "signal {}", signal),
            ShutdownReason::Requested => write!(f, "shutdown request"),
        }
    }
}

type ExitCallback = Box<dyn FnOnce() + Send + 'static>;

/// TCP front end that turns each request into a notification and echoes it.
pub struct Server {
    config: ServerConfig,
    listener: Listener,
    registry: Arc<SessionRegistry>,
    notifier: Arc<dyn Notifier>,
    signals: TerminationSignals,
    shutdown: Shutdown,
    exit_callback: Option<ExitCallback>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("listener", &self.listener)
            .field("registry", &self.registry)
            .field("exit_callback", &self.exit_callback.is_some())
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Register for termination signals and bind the listener.
    ///
    /// Signals are registered first, so one delivered before `run` is
    /// still observed. A bind failure is returned, never retried.
    pub async fn bind(config: ServerConfig, notifier: Arc<dyn Notifier>) -> Result<Self, ServerError> {
        let signals = TerminationSignals::register().map_err(ServerError::Signals)?;
        let shutdown = Shutdown::new();

        let listener = Listener::bind(&config.listener).map_err(|e| match e {
            ListenerError::Bind { address, source } => ServerError::Bind { address, source },
            other => ServerError::Listener(other),
        })?;

        Ok(Self {
            config,
            listener,
            registry: Arc::new(SessionRegistry::new()),
            notifier,
            signals,
            shutdown,
            exit_callback: None,
        })
    }

    /// Set the callback invoked once, after shutdown has stopped every session.
    pub fn set_exit_callback<F>(&mut self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.exit_callback = Some(Box::new(callback));
    }

    /// Get the local address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// The live session set.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// A handle that shuts the server down like a termination signal would.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Serve until a termination signal or shutdown request, then unwind.
    ///
    /// Returns after the listener is closed, every session task has
    /// finished and the exit callback has run.
    pub async fn run(self) -> ShutdownReason {
        let pacer = AcceptPacer::new(&self.config.accept);
        self.serve(pacer).await
    }

    async fn serve(mut self, mut pacer: AcceptPacer) -> ShutdownReason {
        tracing::info!(address = %self.listener.local_addr(), "Server is starting");

        let mut sessions = JoinSet::new();

        let reason = loop {
            tokio::select! {
                biased;
                signal = self.signals.recv() => break ShutdownReason::Signal(signal),
                _ = self.shutdown.wait() => break ShutdownReason::Requested,
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    log_session_exit(joined);
                }
                accepted = pacer.accept(&self.listener) => {
                    if let Ok((stream, peer)) = accepted {
                        tracing::info!(peer_addr = %peer, "Accepted connection");

                        let session = Session::new(
                            stream,
                            Arc::clone(&self.registry),
                            Arc::clone(&self.notifier),
                            self.config.session.clone(),
                        );
                        sessions.spawn(self.registry.start(session));
                    }
                }
            }
        };

        tracing::info!(reason = %reason, "Received shutdown trigger");

        tracing::info!("Stopping accept interface");
        self.listener.close();

        tracing::info!("Terminating all current connections");
        self.registry.stop_all();
        while let Some(joined) = sessions.join_next().await {
            log_session_exit(joined);
        }

        tracing::info!("Server is shutting down");
        if let Some(callback) = self.exit_callback.take() {
            callback();
        }

        reason
    }
}

/// The accept step: waits out the backoff left by earlier failures.
#[derive(Debug)]
struct AcceptPacer {
    backoff: AcceptBackoff,
    resume_at: Option<Instant>,
}

impl AcceptPacer {
    fn new(config: &AcceptConfig) -> Self {
        Self {
            backoff: AcceptBackoff::new(config),
            resume_at: None,
        }
    }

    /// Accept the next connection once any backoff has elapsed.
    ///
    /// Dropping the future mid-wait keeps the deadline, so a restarted
    /// accept does not wait longer than the first one would have.
    async fn accept(
        &mut self,
        listener: &Listener,
    ) -> Result<(TcpStream, SocketAddr), ListenerError> {
        if let Some(deadline) = self.resume_at {
            tokio::time::sleep_until(deadline).await;
        }

        match listener.accept().await {
            Ok(accepted) => {
                self.resume_at = None;
                self.backoff.reset();
                Ok(accepted)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    fn record_failure(&mut self, error: &ListenerError) {
        metrics::record_accept_error();
        let delay = self.backoff.fail();
        tracing::warn!(
            error = %error,
            consecutive_failures = self.backoff.failures(),
            delay_ms = delay.as_millis() as u64,
            "Accept failed, backing off"
        );
        self.resume_at = Some(Instant::now() + delay);
    }

    fn failures(&self) -> u32 {
        self.backoff.failures()
    }
}

fn log_session_exit(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "Session task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn shutdown_reason_display() {
        assert_eq!(
            ShutdownReason::Signal(TerminationSignal::Terminate).to_string(),
            "signal SIGTERM"
        );
        assert_eq!(ShutdownReason::Requested.to_string(), "shutdown request");
    }

    fn loopback_config(backoff_ms: u64) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "127.0.0.1".into();
        config.listener.port = 0;
        config.accept.backoff_base_ms = backoff_ms;
        config.accept.backoff_max_ms = backoff_ms;
        config
    }

    fn silent() -> Arc<dyn Notifier> {
        Arc::new(|_: &str, _: u32| {})
    }

    fn accept_failure() -> ListenerError {
        ListenerError::Accept(io::Error::new(io::ErrorKind::Other, "too many open files"))
    }

    #[tokio::test]
    async fn port_in_use_is_a_bind_error() {
        let first = Server::bind(loopback_config(10), silent()).await.unwrap();

        let mut config = loopback_config(10);
        config.listener.port = first.local_addr().port();
        config.listener.reuse_address = false;

        match Server::bind(config, silent()).await {
            Err(ServerError::Bind { address, .. }) => {
                assert!(address.ends_with(&first.local_addr().port().to_string()));
            }
            Err(other) => panic!("expected a bind error, got {other}"),
            Ok(_) => panic!("second bind on a listening port succeeded"),
        }
    }

    #[tokio::test]
    async fn successful_accept_clears_backoff() {
        let config = loopback_config(20);
        let listener = Listener::bind(&config.listener).unwrap();
        let mut pacer = AcceptPacer::new(&config.accept);

        pacer.record_failure(&accept_failure());
        pacer.record_failure(&accept_failure());
        assert_eq!(pacer.failures(), 2);
        assert!(pacer.resume_at.is_some());

        let addr = listener.local_addr();
        let client = tokio::spawn(async move { TcpStream::connect(addr).await });
        let accepted = tokio::time::timeout(Duration::from_secs(5), pacer.accept(&listener))
            .await
            .expect("accept stalled after backoff");

        assert!(accepted.is_ok());
        assert_eq!(pacer.failures(), 0);
        assert!(pacer.resume_at.is_none());
        client.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_cuts_backoff_short() {
        let server = Server::bind(loopback_config(60_000), silent()).await.unwrap();
        let addr = server.local_addr();
        let registry = server.registry();
        let shutdown = server.shutdown_handle();

        let mut pacer = AcceptPacer::new(&server.config.accept);
        pacer.record_failure(&accept_failure());
        let task = tokio::spawn(server.serve(pacer));

        // Queued in the backlog but not accepted while paused.
        let _client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(registry.is_empty());

        shutdown.trigger();
        let reason = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("shutdown waited out the backoff")
            .unwrap();
        assert_eq!(reason, ShutdownReason::Requested);
    }

    #[tokio::test]
    async fn serves_clients_after_backoff() {
        let server = Server::bind(loopback_config(50), silent()).await.unwrap();
        let addr = server.local_addr();
        let registry = server.registry();
        let shutdown = server.shutdown_handle();

        let mut pacer = AcceptPacer::new(&server.config.accept);
        pacer.record_failure(&accept_failure());
        let task = tokio::spawn(server.serve(pacer));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"ping").await.unwrap();
        let mut reply = [0u8; 4];
        tokio::time::timeout(Duration::from_secs(5), client.read_exact(&mut reply))
            .await
            .expect("no reply after backoff")
            .unwrap();
        assert_eq!(&reply, b"ping");
        assert_eq!(registry.len(), 1);

        shutdown.trigger();
        assert_eq!(task.await.unwrap(), ShutdownReason::Requested);
    }
}
