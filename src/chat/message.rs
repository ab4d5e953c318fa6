//! Server-to-client lines.
//!
//! Everything the relay pushes to a client is a single line of text built
//! here, so the wire wording lives in one place.

use std::fmt;

use super::room::RoomId;

/// Type of chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Room chat from a member.
    Chat,
    /// Member joined a room.
    Join,
    /// Member left a room.
    Leave,
    /// Private message.
    Whisper,
    /// Reply or notice from the server itself.
    System,
}

/// A line pushed to one or more clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Nickname the line is about (empty for system lines).
    pub sender_name: String,
    /// Message type.
    pub message_type: MessageType,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Room chat from `sender`.
    pub fn new(sender_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender_name: sender_name.into(),
            message_type: MessageType::Chat,
            content: content.into(),
        }
    }

    /// Join announcement.
    pub fn join(sender_name: impl Into<String>) -> Self {
        let name = sender_name.into();
        Self {
            content: format!("{name} joined the room."),
            sender_name: name,
            message_type: MessageType::Join,
        }
    }

    /// Departure announcement.
    pub fn leave(sender_name: impl Into<String>) -> Self {
        let name = sender_name.into();
        Self {
            content: format!("{name} left the room."),
            sender_name: name,
            message_type: MessageType::Leave,
        }
    }

    /// Private message from `sender`.
    pub fn whisper(sender_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender_name: sender_name.into(),
            message_type: MessageType::Whisper,
            content: content.into(),
        }
    }

    /// Server notice.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            sender_name: String::new(),
            message_type: MessageType::System,
            content: content.into(),
        }
    }

    /// Format the message as it appears on the wire (without newline).
    pub fn format(&self) -> String {
        match self.message_type {
            MessageType::Chat => format!("{}: {}", self.sender_name, self.content),
            MessageType::Whisper => {
                format!("(Whisper from {}): {}", self.sender_name, self.content)
            }
            MessageType::Join | MessageType::Leave | MessageType::System => self.content.clone(),
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// `Joined room N`
pub fn joined_room(room_id: RoomId) -> String {
    format!("Joined room {room_id}")
}

/// `Room N created.`
pub fn room_created(room_id: RoomId) -> String {
    format!("Room {room_id} created.")
}

/// Sent when a room-scoped command is used outside a room.
pub const NOT_IN_ROOM: &str = "You are not in any room.";

/// Broadcast to everyone still connected when the process stops.
pub const SHUTTING_DOWN: &str = "Server is shutting down.";

/// `Unknown command: /verb`
pub fn unknown_command(verb: &str) -> String {
    format!("Unknown command: {verb}")
}

/// Reply to `/list`.
pub fn format_rooms(room_ids: &[RoomId]) -> Vec<String> {
    let mut lines = Vec::with_capacity(room_ids.len() + 1);
    lines.push("Available rooms:".to_string());
    lines.extend(room_ids.iter().map(|id| format!("Room {id}")));
    lines
}

/// Reply to `/users`.
pub fn format_users(nicknames: &[String]) -> Vec<String> {
    let mut lines = Vec::with_capacity(nicknames.len() + 1);
    lines.push("Online users:".to_string());
    lines.extend(nicknames.iter().cloned());
    lines
}

/// Reply to `/roomusers`.
pub fn format_room_users(members: &[String]) -> Vec<String> {
    let mut lines = Vec::with_capacity(members.len() + 1);
    lines.push("Users in the current room:".to_string());
    lines.extend(members.iter().cloned());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_format() {
        assert_eq!(ChatMessage::new("alice", "hello").format(), "alice: hello");
        assert_eq!(ChatMessage::new("alice", "").format(), "alice: ");
        assert_eq!(ChatMessage::join("bob").format(), "bob joined the room.");
        assert_eq!(ChatMessage::leave("bob").format(), "bob left the room.");
        assert_eq!(
            ChatMessage::whisper("bob", "hi").format(),
            "(Whisper from bob): hi"
        );
        assert_eq!(ChatMessage::system("Room 1 created.").to_string(), "Room 1 created.");
    }

    #[test]
    fn test_join_keeps_sender() {
        let msg = ChatMessage::join("carol");
        assert_eq!(msg.sender_name, "carol");
        assert_eq!(msg.message_type, MessageType::Join);
    }

    #[test]
    fn test_fixed_replies() {
        assert_eq!(joined_room(3), "Joined room 3");
        assert_eq!(room_created(3), "Room 3 created.");
        assert_eq!(unknown_command("/dance"), "Unknown command: /dance");
    }

    #[test]
    fn test_format_rooms() {
        assert_eq!(format_rooms(&[]), vec!["Available rooms:"]);
        assert_eq!(
            format_rooms(&[1, 2]),
            vec!["Available rooms:", "Room 1", "Room 2"]
        );
    }

    #[test]
    fn test_format_users() {
        let names = vec!["alice".to_string(), "bob".to_string()];
        assert_eq!(
            format_users(&names),
            vec!["Online users:", "alice", "bob"]
        );
        assert_eq!(
            format_room_users(&names),
            vec!["Users in the current room:", "alice", "bob"]
        );
    }
}
