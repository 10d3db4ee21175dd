//! Programmatic shutdown for the relay.
//!
//! A `Shutdown` is a sticky one-shot flag. Once triggered it stays
//! triggered, so a waiter that starts late still returns immediately.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Handle that stops a running server the same way a termination signal does.
#[derive(Debug, Clone)]
pub struct Shutdown {
    flag: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Request shutdown. Repeated calls are no-ops.
    pub fn trigger(&self) {
        self.flag.send_replace(true);
    }

    /// Resolves once `trigger` has been called on any clone, before or after
    /// this call.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.flag.subscribe();
        async move {
            while !*rx.borrow_and_update() {
                // Every clone is gone, so nobody can trigger any more.
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
