//! Registry actor implementation
//!
//! The single owner of all shared chat state: the ordered collection of
//! registered clients. Uses the Actor pattern with mpsc channels — sessions
//! send commands here instead of touching each other's sockets, so
//! membership changes, name lookups, and broadcast iteration are serialized
//! by one event loop with no locks.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Commands sent from session tasks to the registry actor
#[derive(Debug)]
pub enum RegistryCommand {
    /// Session finished its naming handshake and joins the chat
    Join {
        client_id: ClientId,
        name: String,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Session is gone (explicit quit, EOF, or I/O failure)
    Leave { client_id: ClientId },
    /// Chat line for everyone except the sender
    Broadcast {
        client_id: ClientId,
        content: String,
    },
    /// Private message for the first client named `target`
    Whisper {
        client_id: ClientId,
        target: String,
        content: String,
    },
    /// Connected-user listing for the sender
    List { client_id: ClientId },
    /// Overwrite the sender's display name
    Rename {
        client_id: ClientId,
        new_name: String,
    },
    /// Drop every registered client and its output channel
    Shutdown,
}

/// The registry actor.
///
/// Clients are kept in registration order: the user listing reflects it, and
/// name lookup resolves duplicate names to the earliest registration.
pub struct Registry {
    /// All registered clients, in registration order
    clients: Vec<Client>,
    /// Command receiver channel
    receiver: mpsc::Receiver<RegistryCommand>,
}

impl Registry {
    /// Create a new registry with the given command receiver
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>) -> Self {
        Self {
            clients: Vec::new(),
            receiver,
        }
    }

    /// Run the registry event loop
    ///
    /// Continuously receives and processes commands until all senders are
    /// dropped.
    pub async fn run(mut self) {
        info!("registry started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("registry stopped");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Join {
                client_id,
                name,
                sender,
            } => {
                self.handle_join(client_id, name, sender);
            }
            RegistryCommand::Leave { client_id } => {
                self.handle_leave(client_id);
            }
            RegistryCommand::Broadcast { client_id, content } => {
                self.handle_broadcast(client_id, content);
            }
            RegistryCommand::Whisper {
                client_id,
                target,
                content,
            } => {
                self.handle_whisper(client_id, target, content);
            }
            RegistryCommand::List { client_id } => {
                self.handle_list(client_id);
            }
            RegistryCommand::Rename {
                client_id,
                new_name,
            } => {
                self.handle_rename(client_id, new_name);
            }
            RegistryCommand::Shutdown => {
                self.handle_shutdown();
            }
        }
    }

    /// Handle a session joining after its naming handshake
    fn handle_join(&mut self, client_id: ClientId, name: String, sender: mpsc::Sender<ServerMessage>) {
        if self.find(client_id).is_some() {
            return;
        }

        info!("client {} joined as '{}'", client_id, name);
        self.clients.push(Client::new(client_id, name, sender));
        debug!("{} clients registered", self.clients.len());
    }

    /// Handle a session leaving
    ///
    /// An absent id means a concurrent trigger (client quit racing a forced
    /// shutdown) already ran the removal; the departure notice must not
    /// repeat, so this is a no-op.
    fn handle_leave(&mut self, client_id: ClientId) {
        let Some(pos) = self.clients.iter().position(|c| c.id == client_id) else {
            return;
        };

        let client = self.clients.remove(pos);
        info!("client {} ('{}') left", client.id, client.name);

        let notice = ServerMessage::Departure { name: client.name };
        self.deliver_to_all(&notice, None);
        debug!("{} clients registered", self.clients.len());
    }

    /// Handle a chat line: everyone but the sender receives it
    fn handle_broadcast(&self, client_id: ClientId, content: String) {
        let Some(sender) = self.find(client_id) else {
            return;
        };

        let msg = ServerMessage::Chat {
            from: sender.name.clone(),
            content,
        };
        self.deliver_to_all(&msg, Some(client_id));
    }

    /// Handle a private message
    ///
    /// The target is the first client in registration order whose current
    /// name matches; nobody else sees the message. An unknown target is
    /// reported to the sender only.
    fn handle_whisper(&self, client_id: ClientId, target: String, content: String) {
        let Some(sender) = self.find(client_id) else {
            return;
        };

        match self.clients.iter().find(|c| c.name == target) {
            Some(recipient) => {
                let msg = ServerMessage::Whisper {
                    from: sender.name.clone(),
                    content,
                };
                if let Err(e) = recipient.send(msg) {
                    warn!("dropping whisper for client {}: {}", recipient.id, e);
                }
            }
            None => {
                let _ = sender.send(ServerMessage::UserNotFound { name: target });
            }
        }
    }

    /// Handle a user-listing request
    fn handle_list(&self, client_id: ClientId) {
        let Some(client) = self.find(client_id) else {
            return;
        };

        let names = self.clients.iter().map(|c| c.name.clone()).collect();
        let _ = client.send(ServerMessage::UserList { names });
    }

    /// Handle a name change
    ///
    /// The new name is not checked against existing names; duplicates are
    /// allowed and whisper resolves them first-match-in-registration-order.
    fn handle_rename(&mut self, client_id: ClientId, new_name: String) {
        let Some(client) = self.clients.iter_mut().find(|c| c.id == client_id) else {
            return;
        };

        info!(
            "client {} renamed '{}' -> '{}'",
            client_id, client.name, new_name
        );
        client.name = new_name.clone();
        let _ = client.send(ServerMessage::Renamed { name: new_name });
    }

    /// Handle forced shutdown: drop every client entry
    ///
    /// Dropping an entry closes that session's output channel; its write
    /// task flushes and shuts the socket down when the channel drains. Safe
    /// when sessions have already left on their own.
    fn handle_shutdown(&mut self) {
        if !self.clients.is_empty() {
            info!("closing {} still-registered clients", self.clients.len());
        }
        self.clients.clear();
    }

    /// Deliver a message to every registered client except `excluding`
    ///
    /// A failed delivery (client gone, or not draining its socket) is logged
    /// and skipped; it never aborts delivery to the remaining clients.
    fn deliver_to_all(&self, msg: &ServerMessage, excluding: Option<ClientId>) {
        for client in &self.clients {
            if Some(client.id) == excluding {
                continue;
            }
            if let Err(e) = client.send(msg.clone()) {
                warn!("dropping message for client {}: {}", client.id, e);
            }
        }
    }

    /// Find a registered client by identity
    fn find(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    fn registry() -> Registry {
        let (_tx, rx) = mpsc::channel(1);
        Registry::new(rx)
    }

    fn join(registry: &mut Registry, name: &str) -> (ClientId, mpsc::Receiver<ServerMessage>) {
        let client_id = ClientId::new();
        let (tx, rx) = mpsc::channel(8);
        registry.handle_command(RegistryCommand::Join {
            client_id,
            name: name.to_string(),
            sender: tx,
        });
        (client_id, rx)
    }

    #[test]
    fn test_join_registers_in_order() {
        let mut registry = registry();
        let (alice, mut alice_rx) = join(&mut registry, "alice");
        let (_bob, _bob_rx) = join(&mut registry, "bob");

        registry.handle_command(RegistryCommand::List { client_id: alice });

        assert_eq!(
            alice_rx.try_recv().unwrap(),
            ServerMessage::UserList {
                names: vec!["alice".to_string(), "bob".to_string()]
            }
        );
    }

    #[test]
    fn test_join_twice_is_a_noop() {
        let mut registry = registry();
        let (alice, mut alice_rx) = join(&mut registry, "alice");

        let (tx, _rx) = mpsc::channel(8);
        registry.handle_command(RegistryCommand::Join {
            client_id: alice,
            name: "imposter".to_string(),
            sender: tx,
        });

        assert_eq!(registry.clients.len(), 1);
        registry.handle_command(RegistryCommand::List { client_id: alice });
        assert_eq!(
            alice_rx.try_recv().unwrap(),
            ServerMessage::UserList {
                names: vec!["alice".to_string()]
            }
        );
    }

    #[test]
    fn test_broadcast_reaches_everyone_but_the_sender() {
        let mut registry = registry();
        let (alice, mut alice_rx) = join(&mut registry, "alice");
        let (_bob, mut bob_rx) = join(&mut registry, "bob");
        let (_carol, mut carol_rx) = join(&mut registry, "carol");

        registry.handle_command(RegistryCommand::Broadcast {
            client_id: alice,
            content: "hi".to_string(),
        });

        let expected = ServerMessage::Chat {
            from: "alice".to_string(),
            content: "hi".to_string(),
        };
        assert_eq!(bob_rx.try_recv().unwrap(), expected);
        assert_eq!(carol_rx.try_recv().unwrap(), expected);
        assert!(matches!(alice_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_broadcast_skips_a_gone_recipient() {
        let mut registry = registry();
        let (alice, _alice_rx) = join(&mut registry, "alice");
        let (_bob, bob_rx) = join(&mut registry, "bob");
        let (_carol, mut carol_rx) = join(&mut registry, "carol");

        // bob's write task is gone but his Leave has not arrived yet
        drop(bob_rx);

        registry.handle_command(RegistryCommand::Broadcast {
            client_id: alice,
            content: "hi".to_string(),
        });

        assert_eq!(
            carol_rx.try_recv().unwrap(),
            ServerMessage::Chat {
                from: "alice".to_string(),
                content: "hi".to_string(),
            }
        );
    }

    #[test]
    fn test_whisper_reaches_only_the_target() {
        let mut registry = registry();
        let (alice, mut alice_rx) = join(&mut registry, "alice");
        let (_bob, mut bob_rx) = join(&mut registry, "bob");
        let (_carol, mut carol_rx) = join(&mut registry, "carol");

        registry.handle_command(RegistryCommand::Whisper {
            client_id: alice,
            target: "bob".to_string(),
            content: "secret".to_string(),
        });

        assert_eq!(
            bob_rx.try_recv().unwrap(),
            ServerMessage::Whisper {
                from: "alice".to_string(),
                content: "secret".to_string(),
            }
        );
        assert!(matches!(alice_rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(matches!(carol_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_whisper_to_unknown_name_replies_to_sender_only() {
        let mut registry = registry();
        let (alice, mut alice_rx) = join(&mut registry, "alice");
        let (_bob, mut bob_rx) = join(&mut registry, "bob");

        registry.handle_command(RegistryCommand::Whisper {
            client_id: alice,
            target: "nobody".to_string(),
            content: "hey".to_string(),
        });

        assert_eq!(
            alice_rx.try_recv().unwrap(),
            ServerMessage::UserNotFound {
                name: "nobody".to_string()
            }
        );
        assert!(matches!(bob_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_whisper_resolves_duplicate_names_to_first_registration() {
        let mut registry = registry();
        let (alice, _alice_rx) = join(&mut registry, "alice");
        let (_bob, mut bob_rx) = join(&mut registry, "bob");
        let (carol, mut carol_rx) = join(&mut registry, "carol");

        // carol renames herself to "bob" as well; the earlier bob still wins
        registry.handle_command(RegistryCommand::Rename {
            client_id: carol,
            new_name: "bob".to_string(),
        });
        carol_rx.try_recv().unwrap(); // rename confirmation

        registry.handle_command(RegistryCommand::Whisper {
            client_id: alice,
            target: "bob".to_string(),
            content: "which one?".to_string(),
        });

        assert_eq!(
            bob_rx.try_recv().unwrap(),
            ServerMessage::Whisper {
                from: "alice".to_string(),
                content: "which one?".to_string(),
            }
        );
        assert!(matches!(carol_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_rename_changes_lookup_and_confirms() {
        let mut registry = registry();
        let (alice, mut alice_rx) = join(&mut registry, "alice");
        let (bob, mut bob_rx) = join(&mut registry, "bob");

        registry.handle_command(RegistryCommand::Rename {
            client_id: bob,
            new_name: "robert".to_string(),
        });

        assert_eq!(
            bob_rx.try_recv().unwrap(),
            ServerMessage::Renamed {
                name: "robert".to_string()
            }
        );

        // The old name no longer resolves
        registry.handle_command(RegistryCommand::Whisper {
            client_id: alice,
            target: "bob".to_string(),
            content: "psst".to_string(),
        });
        assert_eq!(
            alice_rx.try_recv().unwrap(),
            ServerMessage::UserNotFound {
                name: "bob".to_string()
            }
        );

        // The new one does, and alice's own name is untouched
        registry.handle_command(RegistryCommand::Whisper {
            client_id: alice,
            target: "robert".to_string(),
            content: "psst".to_string(),
        });
        assert_eq!(
            bob_rx.try_recv().unwrap(),
            ServerMessage::Whisper {
                from: "alice".to_string(),
                content: "psst".to_string(),
            }
        );
    }

    #[test]
    fn test_leave_announces_departure_to_the_rest() {
        let mut registry = registry();
        let (alice, _alice_rx) = join(&mut registry, "alice");
        let (_bob, mut bob_rx) = join(&mut registry, "bob");

        registry.handle_command(RegistryCommand::Leave { client_id: alice });

        assert_eq!(
            bob_rx.try_recv().unwrap(),
            ServerMessage::Departure {
                name: "alice".to_string()
            }
        );
        assert_eq!(registry.clients.len(), 1);
    }

    #[test]
    fn test_leave_runs_once_under_concurrent_triggers() {
        // A client quit racing a forced shutdown can issue Leave twice; the
        // second one must not produce another departure notice.
        let mut registry = registry();
        let (alice, _alice_rx) = join(&mut registry, "alice");
        let (_bob, mut bob_rx) = join(&mut registry, "bob");

        registry.handle_command(RegistryCommand::Leave { client_id: alice });
        registry.handle_command(RegistryCommand::Leave { client_id: alice });

        assert_eq!(
            bob_rx.try_recv().unwrap(),
            ServerMessage::Departure {
                name: "alice".to_string()
            }
        );
        assert!(matches!(bob_rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(registry.clients.len(), 1);
    }

    #[test]
    fn test_leave_of_unknown_client_is_a_noop() {
        let mut registry = registry();
        let (_alice, mut alice_rx) = join(&mut registry, "alice");

        registry.handle_command(RegistryCommand::Leave {
            client_id: ClientId::new(),
        });

        assert!(matches!(alice_rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(registry.clients.len(), 1);
    }

    #[test]
    fn test_membership_count_tracks_joins_and_leaves() {
        let mut registry = registry();
        assert_eq!(registry.clients.len(), 0);

        let (alice, _alice_rx) = join(&mut registry, "alice");
        let (bob, _bob_rx) = join(&mut registry, "bob");
        assert_eq!(registry.clients.len(), 2);

        registry.handle_command(RegistryCommand::Leave { client_id: alice });
        assert_eq!(registry.clients.len(), 1);
        registry.handle_command(RegistryCommand::Leave { client_id: bob });
        assert_eq!(registry.clients.len(), 0);
    }

    #[test]
    fn test_shutdown_drops_every_client() {
        let mut registry = registry();
        let (_alice, mut alice_rx) = join(&mut registry, "alice");
        let (_bob, mut bob_rx) = join(&mut registry, "bob");

        registry.handle_command(RegistryCommand::Shutdown);

        assert_eq!(registry.clients.len(), 0);
        // Output channels are closed, which ends the sessions' write tasks
        assert!(matches!(
            alice_rx.try_recv(),
            Err(TryRecvError::Disconnected)
        ));
        assert!(matches!(bob_rx.try_recv(), Err(TryRecvError::Disconnected)));
    }
}
