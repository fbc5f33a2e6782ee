//! Client entry kept by the registry
//!
//! Represents one registered session: its identity, current display name,
//! and the sender half of the session's output channel. The session's write
//! task exclusively owns the socket; the registry only enqueues messages
//! here and never writes to a peer directly.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// A registered client.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Current display name (mutable via rename; uniqueness is not enforced)
    pub name: String,
    /// Registry → session output channel
    sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client entry with the given identity, name, and sender.
    pub fn new(id: ClientId, name: String, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { id, name, sender }
    }

    /// Enqueue a message for this client's write task.
    ///
    /// Never waits: a closed channel (client gone) or a full one (peer not
    /// draining its socket) fails immediately, so one slow recipient cannot
    /// stall delivery to the rest of a broadcast.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::ChannelFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}
