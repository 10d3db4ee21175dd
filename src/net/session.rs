//! One accepted client connection and its read loop.
//!
//! # Responsibilities
//! - Resolve the peer address once the session starts
//! - Read one request per socket read, dispatch it, echo it back
//! - Leave the registry when the peer disconnects or the socket fails
//! - Stop promptly when the registry stops it
//!
//! # Design Decisions
//! - One read is one request: bytes up to the first NUL, or all of them
//! - The reply is written in full before the next read is issued, so
//!   request N+1 is never read before reply N is queued
//! - Only `Interrupted` is retried; every other read error is a disconnect
//! - The idle deadline restarts after each completed read and covers the
//!   reply write as well as the next read

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::net::registry::SessionRegistry;
use crate::notification::Notifier;
use crate::observability::metrics;

/// Global atomic counter for session IDs.
/// Relaxed ordering is enough: only uniqueness matters.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Stop capability for a running session, held by the registry.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Close the session. Calling it again is a no-op.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

/// The request carried by one read: everything before the first NUL.
pub fn extract_message(buf: &[u8]) -> &[u8] {
    match buf.iter().position(|&b| b == 0) {
        Some(end) => &buf[..end],
        None => buf,
    }
}

/// How a session's read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// Peer closed or the socket failed; the session must leave the registry.
    Disconnected,
    /// Idle deadline elapsed.
    Idle,
    /// A handle stopped us, through the registry or directly.
    Stopped,
}

/// Live state for one accepted connection.
pub struct Session {
    id: SessionId,
    stream: TcpStream,
    registry: Arc<SessionRegistry>,
    notifier: Arc<dyn Notifier>,
    config: SessionConfig,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap an accepted socket. Nothing is read until [`Session::start`].
    pub fn new(
        stream: TcpStream,
        registry: Arc<SessionRegistry>,
        notifier: Arc<dyn Notifier>,
        config: SessionConfig,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            id: SessionId::new(),
            stream,
            registry,
            notifier,
            config,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// A handle that can stop this session from elsewhere.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            stop_tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Resolve the peer address and run the read loop until the session ends.
    ///
    /// The socket is closed when this returns.
    pub async fn start(mut self) {
        let peer = match self.stream.peer_addr() {
            Ok(addr) => addr,
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Could not resolve peer address");
                self.registry.stop(self.id);
                return;
            }
        };

        let exit = self.read_loop(peer).await;
        match exit {
            Exit::Disconnected => {
                tracing::info!(session_id = %self.id, peer_addr = %peer, "Client disconnected");
            }
            Exit::Idle => {
                tracing::info!(session_id = %self.id, peer_addr = %peer, "Closing idle session");
            }
            Exit::Stopped => {
                tracing::debug!(session_id = %self.id, peer_addr = %peer, "Session stopped");
            }
        }
        // No-op when whoever stopped us already removed the entry.
        self.registry.stop(self.id);
    }

    async fn read_loop(&mut self, peer: SocketAddr) -> Exit {
        let mut buf = vec![0u8; self.config.buffer_size];
        let idle_timeout = self.config.idle_timeout_secs.map(Duration::from_secs);
        let mut deadline = idle_timeout.map(|timeout| Instant::now() + timeout);

        loop {
            let read = tokio::select! {
                biased;
                _ = stop_requested(&mut self.stop_rx) => return Exit::Stopped,
                _ = idle_until(deadline) => return Exit::Idle,
                read = self.stream.read(&mut buf) => read,
            };

            let n = match read {
                Ok(0) => return Exit::Disconnected,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(session_id = %self.id, peer_addr = %peer, error = %e, "Read failed");
                    return Exit::Disconnected;
                }
            };

            tracing::info!(session_id = %self.id, peer_addr = %peer, bytes = n, "Received data");
            deadline = idle_timeout.map(|timeout| Instant::now() + timeout);

            let request = extract_message(&buf[..n]).to_vec();
            buf[..n].fill(0);

            if let Some(exit) = self.handle_request(peer, &request, deadline).await {
                return exit;
            }
        }
    }

    /// Dispatch one request and echo it. `Some` ends the session.
    ///
    /// The reply shares the idle deadline of the read that produced it, so a
    /// peer that stops reading cannot park the session in a stalled write.
    async fn handle_request(
        &mut self,
        peer: SocketAddr,
        request: &[u8],
        deadline: Option<Instant>,
    ) -> Option<Exit> {
        let message = String::from_utf8_lossy(request);
        metrics::record_message(request.len());

        if let Err(e) = self
            .notifier
            .notify(&message, self.config.notification_lifetime_ms)
        {
            tracing::warn!(session_id = %self.id, error = %e, "Notification dropped");
        }

        let write = tokio::select! {
            biased;
            _ = stop_requested(&mut self.stop_rx) => return Some(Exit::Stopped),
            _ = idle_until(deadline) => return Some(Exit::Idle),
            write = self.stream.write_all(request) => write,
        };

        match write {
            Ok(()) if !request.is_empty() => {
                metrics::record_bytes_sent(request.len());
                tracing::info!(session_id = %self.id, peer_addr = %peer, bytes = request.len(), "Sent reply");
            }
            Ok(()) => {}
            // The next read sees the broken socket.
            Err(e) => {
                tracing::debug!(session_id = %self.id, peer_addr = %peer, error = %e, "Reply not delivered");
            }
        }
        None
    }
}

async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // Sender gone without a stop; nothing can stop us any more.
            std::future::pending::<()>().await;
        }
    }
}

async fn idle_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
        assert!(id1.to_string().starts_with("session-"));
    }

    #[test]
    fn message_stops_at_first_nul() {
        assert_eq!(extract_message(b"hello"), b"hello");
        assert_eq!(extract_message(b"abc\0def"), b"abc");
        assert_eq!(extract_message(b"\0tail"), b"");
        assert_eq!(extract_message(b""), b"");
    }
}
