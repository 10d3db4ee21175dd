//! TCP listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured IPv4 address with `SO_REUSEADDR`
//! - Accept incoming TCP connections
//! - Refuse to accept once closed for shutdown

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),

    /// The listener was closed for shutdown.
    #[error("Listener closed")]
    Closed,
}

/// The listening socket of the relay.
///
/// At most one accept is in flight at a time because `accept` takes `&self`
/// from the single accept loop.
#[derive(Debug)]
pub struct Listener {
    /// `None` once closed.
    inner: Option<TcpListener>,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind and listen on the configured address.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let address = config.socket_address();
        let bind_err = |source| ListenerError::Bind {
            address: address.clone(),
            source,
        };

        let ip: Ipv4Addr = config.bind_address.parse().map_err(|e| {
            bind_err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let socket = TcpSocket::new_v4().map_err(bind_err)?;
        socket.set_reuseaddr(config.reuse_address).map_err(bind_err)?;
        socket
            .bind(SocketAddr::V4(SocketAddrV4::new(ip, config.port)))
            .map_err(bind_err)?;
        let listener = socket.listen(config.backlog).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        tracing::info!(
            address = %local_addr,
            reuse_address = config.reuse_address,
            "Listener bound"
        );

        Ok(Self {
            inner: Some(listener),
            local_addr,
        })
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let listener = self.inner.as_ref().ok_or(ListenerError::Closed)?;
        let (stream, addr) = listener.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(peer_addr = %addr, "Connection accepted");
        Ok((stream, addr))
    }

    /// Close the listening socket. New connection attempts are refused.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            tracing::info!(address = %self.local_addr, "Listener closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
