//! Server-to-client message definitions
//!
//! Every reply the server produces is one of these variants; `Display`
//! renders the exact wire text. A session's write task appends one trailing
//! newline per message, so multi-line texts (welcome, help, listing) embed
//! their interior newlines here.

use std::fmt;

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Handshake prompt asking for a display name
    NamePrompt,
    /// Welcome text (with the help hint) sent after the handshake
    Welcome { name: String },
    /// Chat line relayed from another user
    Chat { from: String, content: String },
    /// Private message from another user
    Whisper { from: String, content: String },
    /// Correct whisper usage, sent on a malformed `/w`
    WhisperUsage,
    /// Whisper target is not currently connected
    UserNotFound { name: String },
    /// Connected-user listing, in registration order
    UserList { names: Vec<String> },
    /// Prompt for a new name after `/c`
    RenamePrompt,
    /// Confirmation of a name change
    Renamed { name: String },
    /// The static command reference
    Help,
    /// Somebody disconnected
    Departure { name: String },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::NamePrompt => write!(f, "Please, insert your name: "),
            ServerMessage::Welcome { name } => write!(
                f,
                "Welcome {name}! You are connected. \n Type /h to see a list of available commands. \n"
            ),
            ServerMessage::Chat { from, content } => write!(f, "{from}: {content}"),
            ServerMessage::Whisper { from, content } => {
                write!(f, "[Whisper from {from}]: {content}")
            }
            ServerMessage::WhisperUsage => write!(f, "Correct use: /w <name> <message>"),
            ServerMessage::UserNotFound { name } => write!(f, "User {name} not found."),
            ServerMessage::UserList { names } => {
                write!(f, "Connected users: ")?;
                for name in names {
                    write!(f, "\n- {name}")?;
                }
                Ok(())
            }
            ServerMessage::RenamePrompt => write!(f, "Type your name: "),
            ServerMessage::Renamed { name } => write!(f, "New username: {name}"),
            ServerMessage::Help => {
                write!(f, " /w - Sends a private message for a specific user.")?;
                write!(f, "\n /h - Show available commands.")?;
                write!(f, "\n /c - Changes the username.")?;
                write!(f, "\n /l - Lists all connected users.")?;
                write!(f, "\n /q - Leaves the chat.")
            }
            ServerMessage::Departure { name } => write!(f, "{name} has left the chat."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_includes_name_and_help_hint() {
        let msg = ServerMessage::Welcome {
            name: "alice".to_string(),
        };
        assert_eq!(
            msg.to_string(),
            "Welcome alice! You are connected. \n Type /h to see a list of available commands. \n"
        );
    }

    #[test]
    fn test_chat_and_whisper_rendering() {
        let chat = ServerMessage::Chat {
            from: "alice".to_string(),
            content: "hi".to_string(),
        };
        assert_eq!(chat.to_string(), "alice: hi");

        let whisper = ServerMessage::Whisper {
            from: "alice".to_string(),
            content: "secret".to_string(),
        };
        assert_eq!(whisper.to_string(), "[Whisper from alice]: secret");
    }

    #[test]
    fn test_whisper_error_replies() {
        assert_eq!(
            ServerMessage::WhisperUsage.to_string(),
            "Correct use: /w <name> <message>"
        );
        let not_found = ServerMessage::UserNotFound {
            name: "bob".to_string(),
        };
        assert_eq!(not_found.to_string(), "User bob not found.");
    }

    #[test]
    fn test_user_list_renders_in_given_order() {
        let msg = ServerMessage::UserList {
            names: vec!["alice".to_string(), "bob".to_string()],
        };
        assert_eq!(msg.to_string(), "Connected users: \n- alice\n- bob");
    }

    #[test]
    fn test_user_list_with_no_names_is_just_the_header() {
        let msg = ServerMessage::UserList { names: Vec::new() };
        assert_eq!(msg.to_string(), "Connected users: ");
    }

    #[test]
    fn test_help_lists_all_five_commands() {
        let help = ServerMessage::Help.to_string();
        let lines: Vec<&str> = help.split('\n').collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], " /w - Sends a private message for a specific user.");
        assert_eq!(lines[1], " /h - Show available commands.");
        assert_eq!(lines[2], " /c - Changes the username.");
        assert_eq!(lines[3], " /l - Lists all connected users.");
        assert_eq!(lines[4], " /q - Leaves the chat.");
    }

    #[test]
    fn test_rename_and_departure() {
        assert_eq!(ServerMessage::RenamePrompt.to_string(), "Type your name: ");
        let renamed = ServerMessage::Renamed {
            name: "robert".to_string(),
        };
        assert_eq!(renamed.to_string(), "New username: robert");
        let departure = ServerMessage::Departure {
            name: "bob".to_string(),
        };
        assert_eq!(departure.to_string(), "bob has left the chat.");
    }
}
