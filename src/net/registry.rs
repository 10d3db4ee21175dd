//! The authoritative set of live sessions.
//!
//! # Responsibilities
//! - Insert a session and start it on accept
//! - Remove and stop a session on disconnect or on request
//! - Stop every session during shutdown
//!
//! # Design Decisions
//! - Entries are stop handles keyed by `SessionId`; the session task owns
//!   the socket, so removing an entry never frees state an in-flight read
//!   still uses
//! - Removal happens once: whichever of `stop` / `stop_all` gets the entry
//!   first wins, the other is a no-op

use std::future::Future;

use dashmap::DashMap;

use crate::net::session::{Session, SessionHandle, SessionId};
use crate::observability::metrics;

/// Tracks every live session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `session` and return its running read loop.
    ///
    /// The entry exists as soon as this returns; the caller spawns the future.
    pub fn start(&self, session: Session) -> impl Future<Output = ()> + Send + 'static {
        let handle = session.handle();
        self.sessions.insert(handle.id(), handle);
        metrics::record_session_opened(self.sessions.len());
        session.start()
    }

    /// Remove the session if present and stop it.
    ///
    /// Returns whether an entry was removed.
    pub fn stop(&self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some((_, handle)) => {
                handle.stop();
                metrics::record_active_sessions(self.sessions.len());
                true
            }
            None => false,
        }
    }

    /// Stop every tracked session and clear the set.
    ///
    /// Returns how many sessions were stopped.
    pub fn stop_all(&self) -> usize {
        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        let stopped = ids.into_iter().filter(|id| self.stop(*id)).count();

        tracing::info!(count = stopped, "Terminated live sessions");
        metrics::record_active_sessions(self.sessions.len());
        stopped
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// IDs of the live sessions, in ascending order.
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    use crate::config::SessionConfig;
    use crate::notification::Notifier;

    async fn connected_session(registry: &Arc<SessionRegistry>) -> (Session, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server_side, _) = listener.accept().await.unwrap();
        let notifier: Arc<dyn Notifier> = Arc::new(|_: &str, _: u32| {});
        let session = Session::new(
            server_side,
            Arc::clone(registry),
            notifier,
            SessionConfig::default(),
        );
        (session, client)
    }

    #[test]
    fn stop_all_on_empty_registry() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.stop_all(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn start_inserts_and_stop_removes_once() {
        let registry = Arc::new(SessionRegistry::new());
        let (session, _client) = connected_session(&registry).await;
        let id = session.id();
        let handle = session.handle();

        let task = tokio::spawn(registry.start(session));
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);

        assert!(registry.stop(id));
        assert!(!registry.stop(id));
        assert!(handle.is_stopped());
        assert!(registry.is_empty());

        task.await.unwrap();
    }

    #[tokio::test]
    async fn stop_all_stops_every_session() {
        let registry = Arc::new(SessionRegistry::new());
        let mut tasks = Vec::new();
        let mut handles = Vec::new();
        let mut clients = Vec::new();

        for _ in 0..3 {
            let (session, client) = connected_session(&registry).await;
            handles.push(session.handle());
            tasks.push(tokio::spawn(registry.start(session)));
            clients.push(client);
        }
        assert_eq!(registry.ids().len(), 3);

        assert_eq!(registry.stop_all(), 3);
        assert!(registry.is_empty());
        assert!(handles.iter().all(SessionHandle::is_stopped));

        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn direct_handle_stop_leaves_registry() {
        let registry = Arc::new(SessionRegistry::new());
        let (session, _client) = connected_session(&registry).await;
        let id = session.id();
        let handle = session.handle();

        let task = tokio::spawn(registry.start(session));
        handle.stop();
        task.await.unwrap();

        assert!(!registry.contains(id));
        assert!(registry.is_empty());
        assert!(!registry.stop(id));
    }

    #[tokio::test]
    async fn disconnect_removes_entry() {
        let registry = Arc::new(SessionRegistry::new());
        let (session, mut client) = connected_session(&registry).await;
        let id = session.id();

        let task = tokio::spawn(registry.start(session));
        client.shutdown().await.unwrap();
        drop(client);
        task.await.unwrap();

        assert!(!registry.contains(id));
    }
}
