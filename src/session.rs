//! Per-connection session worker
//!
//! Owns one client's TCP socket: performs the naming handshake, runs the
//! read loop, and forwards classified commands to the registry. A dedicated
//! write task drains the session's output channel, so neither the registry
//! nor any other session ever writes to this socket.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::registry::RegistryCommand;
use crate::types::ClientId;

/// Per-session output channel capacity
///
/// A recipient that stops draining its socket gets further deliveries
/// dropped once this many are queued, rather than stalling the registry.
const OUTBOX_CAPACITY: usize = 32;

/// Serve one client connection until it quits, hits end-of-stream, or fails.
///
/// Lifecycle: prompt for a name, register with the registry, then read lines
/// and dispatch them until the connection ends. Every exit path runs the
/// termination sequence exactly once: Leave command, output channel closed,
/// write task joined.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<RegistryCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let client_id = ClientId::new();
    debug!("session {} serving {}", client_id, peer_addr);

    let (read_half, write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);
    let write_task = tokio::spawn(write_outbox(write_half, msg_rx));

    // Naming handshake. A client that disconnects before sending a name is
    // never registered and nobody is notified.
    let _ = msg_tx.send(ServerMessage::NamePrompt).await;
    let name = match lines.next_line().await {
        Ok(Some(name)) => name,
        Ok(None) | Err(_) => {
            debug!("session {} closed before naming", client_id);
            drop(msg_tx);
            let _ = write_task.await;
            return Ok(());
        }
    };

    let _ = msg_tx
        .send(ServerMessage::Welcome { name: name.clone() })
        .await;

    if cmd_tx
        .send(RegistryCommand::Join {
            client_id,
            name: name.clone(),
            sender: msg_tx.clone(),
        })
        .await
        .is_err()
    {
        warn!("session {} could not register - registry closed", client_id);
        drop(msg_tx);
        let _ = write_task.await;
        return Err(AppError::ChannelSend);
    }

    info!(
        "session {} registered as '{}' from {}",
        client_id, name, peer_addr
    );

    // Serve loop. End-of-stream and read failures are an implicit /q; a
    // closed registry channel means the server is shutting down, which ends
    // the session the same way.
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("session {} reached end of stream", client_id);
                break;
            }
            Err(e) => {
                warn!("session {} read failed: {}", client_id, e);
                break;
            }
        };

        match Command::parse(&line) {
            Command::Quit => break,
            Command::Whisper { target, content } => {
                let cmd = RegistryCommand::Whisper {
                    client_id,
                    target: target.to_string(),
                    content: content.to_string(),
                };
                if cmd_tx.send(cmd).await.is_err() {
                    break;
                }
            }
            Command::InvalidWhisper => {
                let _ = msg_tx.send(ServerMessage::WhisperUsage).await;
            }
            Command::List => {
                if cmd_tx.send(RegistryCommand::List { client_id }).await.is_err() {
                    break;
                }
            }
            Command::Rename => {
                let _ = msg_tx.send(ServerMessage::RenamePrompt).await;
                match lines.next_line().await {
                    Ok(Some(new_name)) => {
                        let cmd = RegistryCommand::Rename {
                            client_id,
                            new_name,
                        };
                        if cmd_tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            Command::Help => {
                let _ = msg_tx.send(ServerMessage::Help).await;
            }
            Command::Broadcast(content) => {
                let cmd = RegistryCommand::Broadcast {
                    client_id,
                    content: content.to_string(),
                };
                if cmd_tx.send(cmd).await.is_err() {
                    break;
                }
            }
        }
    }

    // Termination sequence, reached from every serve-loop exit. The registry
    // treats a repeated Leave as a no-op, so a quit racing a forced shutdown
    // cannot produce two departure notices. Closing the output channel lets
    // the write task flush pending replies and shut the socket down.
    let _ = cmd_tx.send(RegistryCommand::Leave { client_id }).await;
    drop(msg_tx);
    let _ = write_task.await;

    info!("session {} closed", client_id);
    Ok(())
}

/// Drain a session's output channel into its socket
///
/// Renders each message and appends one newline. Exits when the channel
/// closes (session over, or the registry dropped its sender on shutdown) or
/// the peer stops accepting writes, then shuts the write half down.
async fn write_outbox(mut write_half: OwnedWriteHalf, mut msg_rx: mpsc::Receiver<ServerMessage>) {
    while let Some(msg) = msg_rx.recv().await {
        let mut line = msg.to_string();
        line.push('\n');
        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            debug!("socket write failed: {}", e);
            break;
        }
    }
    let _ = write_half.shutdown().await;
}
