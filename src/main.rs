//! TCP Chat Server - Entry Point
//!
//! Binds the listener, wires Ctrl-C to the shutdown signal, and runs the
//! accept loop.

use std::env;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use linechat::{Server, DEFAULT_MAX_SESSIONS};

/// Default server address
const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=linechat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("linechat=info")),
        )
        .init();

    // Bind address and session cap from the command line, with defaults
    let mut args = env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let max_sessions = match args.next() {
        Some(n) => n.parse()?,
        None => DEFAULT_MAX_SESSIONS,
    };

    let server = Server::bind(&addr, max_sessions).await?;

    // Graceful shutdown on Ctrl-C
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            let _ = shutdown_tx.send(());
        }
    });

    if let Err(e) = server.run(shutdown_rx).await {
        error!("server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
