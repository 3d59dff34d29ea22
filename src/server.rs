//! TCP server for line-echo connections.
//!
//! Accepts incoming connections and hands each one to its own session task.
//! The accept loop never waits on a session, and sessions know nothing of
//! each other.

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::error::ServerError;
use crate::session::Session;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Server instance
pub struct Server {
    listener: TcpListener,
    log: Arc<ActivityLog>,
    idle_timeout: Duration,
}

impl Server {
    /// Bind the configured port on every interface.
    ///
    /// Failure to bind is fatal to the caller.
    pub async fn bind(config: &Config) -> Result<Self, ServerError> {
        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self::from_listener(listener, config))
    }

    /// Build a server around an already-bound listener
    pub fn from_listener(listener: TcpListener, config: &Config) -> Self {
        Server {
            listener,
            log: Arc::new(ActivityLog::new(config.log_dir.clone())),
            idle_timeout: config.idle_timeout,
        }
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever
    pub async fn run(self) {
        match self.local_addr() {
            Ok(addr) => info!(address = %addr, "Server listening"),
            Err(e) => error!(error = %e, "Server listening on unknown address"),
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let session =
                        Session::new(addr.to_string(), Arc::clone(&self.log), self.idle_timeout);
                    debug!(peer = %session.peer(), "New connection");

                    tokio::spawn(session.run(stream));
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
