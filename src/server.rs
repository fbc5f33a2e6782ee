//! Listener and session dispatch
//!
//! Accepts connections and spawns one session task per client, bounded by a
//! fixed number of slots. A connection beyond the cap is simply not accepted
//! until a slot frees, so the backlog queues in the kernel's accept queue
//! rather than in the application. Also owns the shutdown sequence.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::registry::{Registry, RegistryCommand};
use crate::session::handle_connection;

/// Channel buffer size for registry commands
const COMMAND_BUFFER_SIZE: usize = 256;

/// Default cap on concurrently served sessions
pub const DEFAULT_MAX_SESSIONS: usize = 10;

/// Default grace period for in-flight sessions to finish during shutdown
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The chat server: a bound listener plus its dispatch policy.
pub struct Server {
    listener: TcpListener,
    max_sessions: usize,
    shutdown_grace: Duration,
}

impl Server {
    /// Bind the listener on `addr` with a cap on concurrent sessions.
    pub async fn bind(addr: &str, max_sessions: usize) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            max_sessions,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        })
    }

    /// The address the listener actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Override the shutdown grace period.
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Accept and serve connections until `shutdown` fires or the listener
    /// fails, then run the shutdown sequence.
    ///
    /// Dropping the shutdown sender is equivalent to firing it. A listener
    /// failure is returned after shutdown completes.
    pub async fn run(self, mut shutdown: watch::Receiver<()>) -> Result<(), AppError> {
        let Server {
            listener,
            max_sessions,
            shutdown_grace,
        } = self;

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let registry_task = tokio::spawn(Registry::new(cmd_rx).run());

        let slots = Arc::new(Semaphore::new(max_sessions));
        let mut sessions = JoinSet::new();
        let mut accept_error = None;

        info!(
            "listening on {} ({} session slots)",
            listener.local_addr()?,
            max_sessions
        );

        loop {
            // Wait for a free slot before accepting; connections beyond the
            // cap sit in the kernel backlog until one opens up.
            let permit = tokio::select! {
                _ = shutdown.changed() => break,
                permit = slots.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, addr) = tokio::select! {
                _ = shutdown.changed() => break,
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("accept failed: {}", e);
                        accept_error = Some(e);
                        break;
                    }
                },
            };

            info!("new connection from {}", addr);
            let cmd_tx = cmd_tx.clone();
            sessions.spawn(async move {
                // Hold the slot for the lifetime of the session
                let _slot = permit;
                if let Err(e) = handle_connection(stream, cmd_tx).await {
                    error!("session error: {}", e);
                }
            });
        }

        // Stop accepting before tearing sessions down
        drop(listener);
        info!("shutting down; {} sessions in flight", sessions.len());

        let drained = timeout(shutdown_grace, async {
            while sessions.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                "grace period elapsed; cancelling {} sessions",
                sessions.len()
            );
            sessions.abort_all();
            while sessions.join_next().await.is_some() {}
        }

        // Close every still-registered client, then let the registry drain
        // and stop once the last command sender is gone
        let _ = cmd_tx.send(RegistryCommand::Shutdown).await;
        drop(cmd_tx);
        let _ = registry_task.await;

        match accept_error {
            Some(e) => Err(AppError::Io(e)),
            None => Ok(()),
        }
    }
}
