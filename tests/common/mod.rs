//! Shared utilities for the relay integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notice_relay::config::ServerConfig;
use notice_relay::lifecycle::Shutdown;
use notice_relay::net::SessionRegistry;
use notice_relay::{Notifier, NotifyError, Server, ShutdownReason};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// Notifier that remembers every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<(String, u32)>>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, lifetime_ms: u32) -> Result<(), NotifyError> {
        self.calls.lock().unwrap().push((message.to_string(), lifetime_ms));
        Ok(())
    }
}

/// A server running in the background.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub registry: Arc<SessionRegistry>,
    pub shutdown: Shutdown,
    pub exits: Arc<AtomicUsize>,
    pub task: JoinHandle<ShutdownReason>,
}

/// Config bound to an ephemeral loopback port.
pub fn loopback_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1".into();
    config.listener.port = 0;
    config
}

/// Bind `config` and run the server on a spawned task.
pub async fn spawn_server(config: ServerConfig, notifier: Arc<dyn Notifier>) -> RunningServer {
    let mut server = Server::bind(config, notifier).await.unwrap();
    let exits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&exits);
    server.set_exit_callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    RunningServer {
        addr: server.local_addr(),
        registry: server.registry(),
        shutdown: server.shutdown_handle(),
        exits,
        task: tokio::spawn(server.run()),
    }
}

/// Send `request` and read back exactly `expected_len` reply bytes.
pub async fn round_trip(stream: &mut TcpStream, request: &[u8], expected_len: usize) -> Vec<u8> {
    stream.write_all(request).await.unwrap();
    let mut reply = vec![0u8; expected_len];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut reply))
        .await
        .expect("reply timed out")
        .unwrap();
    reply
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
