//! Notice relay (v1)
//!
//! Accepts TCP connections, raises every request as a notification and
//! echoes it back to the client.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                 NOTICE RELAY                  │
//!                     │                                               │
//!   Client request    │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!   ──────────────────┼─▶│ listener │──▶│ session  │──▶│ notifier │──┼──▶ Presenter
//!                     │  └──────────┘   └────┬─────┘   └──────────┘  │
//!   Echo reply        │                      │                        │
//!   ◀─────────────────┼──────────────────────┘                        │
//!                     │                                               │
//!                     │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!                     │  │ registry │   │ signals  │   │  config  │  │
//!                     │  └──────────┘   └──────────┘   └──────────┘  │
//!                     └──────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one current-thread reactor.

use std::sync::Arc;

use clap::Parser;

use notice_relay::lifecycle::startup::{resolve_config, StartupArgs};
use notice_relay::notification::LogNotifier;
use notice_relay::observability::{logging, metrics};
use notice_relay::Server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = StartupArgs::parse();
    let config = resolve_config(&args)?;

    logging::init_logging(&config.observability)?;

    tracing::info!("notice-relay v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        port = config.listener.port,
        buffer_size = config.session.buffer_size,
        idle_timeout_secs = ?config.session.idle_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut server = Server::bind(config, Arc::new(LogNotifier)).await?;
    server.set_exit_callback(|| tracing::info!("Notification presenter released"));

    let reason = server.run().await;

    tracing::info!(reason = %reason, "Shutdown complete");
    Ok(())
}
