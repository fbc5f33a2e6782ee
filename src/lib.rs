//! Multi-client TCP chat server library
//!
//! A line-oriented chat server: clients connect, pick a display name, and
//! exchange broadcast and private messages through a small `/`-prefixed
//! command protocol.
//!
//! # Protocol
//! - `/q` quit, `/w <name> <message>` whisper, `/l` list users,
//!   `/c` change name, `/h` help
//! - Any other line is broadcast to everyone else as `<name>: <line>`
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Registry` is the single owner of all shared state (the ordered set of
//!   registered clients); sessions talk to it through `RegistryCommand`s
//! - Each connection is served by a session task running the read loop, plus
//!   a write task that exclusively owns the socket's write half
//! - No locks: membership changes and broadcast iteration are serialized by
//!   the registry's event loop, and cross-session delivery is message
//!   passing into the target session's output channel
//! - `Server` accepts connections, bounds concurrent sessions with a
//!   semaphore, and owns the shutdown sequence
//!
//! # Example
//! ```ignore
//! use tokio::sync::watch;
//! use linechat::Server;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::bind("127.0.0.1:8080", 10).await.unwrap();
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(());
//!     server.run(shutdown_rx).await.unwrap();
//! }
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use command::Command;
pub use error::{AppError, SendError};
pub use message::ServerMessage;
pub use registry::{Registry, RegistryCommand};
pub use server::{Server, DEFAULT_MAX_SESSIONS};
pub use session::handle_connection;
pub use types::ClientId;
