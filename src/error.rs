//! Error types for the chat server
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers fatal conditions only: a broken socket or listener, or a broken
/// internal channel. Protocol misuse (bad whisper syntax, unknown target)
/// is never an error — it is answered with a plain text line to the client.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error on the listener or a client connection (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

/// Message send errors
///
/// Occurs when attempting to enqueue a message on a session's output channel.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The channel is full; the recipient is not draining its socket
    #[error("Channel full")]
    ChannelFull,
}
