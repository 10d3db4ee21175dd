//! Real termination signal delivery. Kept in its own binary: the signal
//! reaches every server in the process.

#![cfg(unix)]

use std::process::Command;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use notice_relay::lifecycle::TerminationSignal;
use notice_relay::ShutdownReason;
use tokio::net::TcpStream;

mod common;

use common::{loopback_config, round_trip, spawn_server, RecordingNotifier};

#[tokio::test]
async fn test_sigterm_triggers_graceful_shutdown() {
    let server = spawn_server(loopback_config(), Arc::new(RecordingNotifier::default())).await;

    let mut client = TcpStream::connect(server.addr).await.unwrap();
    round_trip(&mut client, b"before signal", 13).await;
    assert_eq!(server.registry.len(), 1);

    let status = Command::new("kill")
        .arg("-TERM")
        .arg(std::process::id().to_string())
        .status()
        .unwrap();
    assert!(status.success());

    let reason = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("run did not return after SIGTERM")
        .unwrap();

    assert_eq!(reason, ShutdownReason::Signal(TerminationSignal::Terminate));
    assert_eq!(server.exits.load(Ordering::SeqCst), 1);
    assert!(server.registry.is_empty());
    assert!(TcpStream::connect(server.addr).await.is_err());
}
