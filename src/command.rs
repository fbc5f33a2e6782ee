//! Command interpretation
//!
//! Pure classification of one input line into a chat command. Lines are
//! matched case-sensitively on their two-character prefix; anything that does
//! not match a known prefix is broadcast verbatim, including empty lines and
//! lines starting with `/` that spell no known command.

/// A classified input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/q` - leave the chat
    Quit,
    /// `/w <name> <message>` - private message for the first session named `name`
    Whisper { target: &'a str, content: &'a str },
    /// `/w` with fewer than three tokens; the sender gets a usage reply
    InvalidWhisper,
    /// `/l` - list connected users
    List,
    /// `/c` - change username; the next input line is read as the new name
    Rename,
    /// `/h` - show available commands
    Help,
    /// Anything else - relayed verbatim to everyone but the sender
    Broadcast(&'a str),
}

impl<'a> Command<'a> {
    /// Classify a single input line.
    pub fn parse(line: &'a str) -> Self {
        if line.starts_with("/q") {
            Command::Quit
        } else if line.starts_with("/w") {
            // At most 3 tokens, split on single spaces:
            // "/w bob hi there" -> ["/w", "bob", "hi there"]
            let mut tokens = line.splitn(3, ' ');
            tokens.next();
            match (tokens.next(), tokens.next()) {
                (Some(target), Some(content)) => Command::Whisper { target, content },
                _ => Command::InvalidWhisper,
            }
        } else if line.starts_with("/l") {
            Command::List
        } else if line.starts_with("/c") {
            Command::Rename
        } else if line.starts_with("/h") {
            Command::Help
        } else {
            Command::Broadcast(line)
        }
    }
}
