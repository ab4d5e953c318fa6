//! Chat command parser for chatrelay.
//!
//! Every line after the nickname goes through [`parse_input`]. Lines
//! starting with `/` are commands, anything else is a chat message for the
//! sender's current room.

use super::room::RoomId;

/// Prefix that marks a line as a command.
pub const COMMAND_PREFIX: char = '/';

/// Result of parsing a chat input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Regular chat message, kept verbatim.
    Message(String),
    /// Parsed command.
    Command(ChatCommand),
}

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// List every room ever created.
    ListRooms,
    /// Create a room and join it.
    CreateRoom,
    /// Join an existing room.
    JoinRoom(RoomId),
    /// Leave the current room.
    ExitRoom,
    /// List every connected user.
    ListUsers,
    /// List the members of the current room.
    ListRoomUsers,
    /// Private message to a single user.
    Whisper { target: String, text: String },
    /// Close the connection.
    Disconnect,
    /// A known command with missing or invalid arguments.
    Malformed(Usage),
    /// Unknown command, including the leading `/`.
    Unknown(String),
}

/// Commands that take arguments, used to pick the usage line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Join,
    Whisper,
}

impl Usage {
    /// Usage line sent back for a malformed command.
    pub fn message(&self) -> &'static str {
        match self {
            Usage::Join => "Usage: /join [roomNumber]",
            Usage::Whisper => "Usage: /whisper [nickname] [message]",
        }
    }
}

impl ChatCommand {
    /// Get the command name.
    pub fn name(&self) -> &str {
        match self {
            ChatCommand::ListRooms => "list",
            ChatCommand::CreateRoom => "create",
            ChatCommand::JoinRoom(_) | ChatCommand::Malformed(Usage::Join) => "join",
            ChatCommand::ExitRoom => "exit",
            ChatCommand::ListUsers => "users",
            ChatCommand::ListRoomUsers => "roomusers",
            ChatCommand::Whisper { .. } | ChatCommand::Malformed(Usage::Whisper) => "whisper",
            ChatCommand::Disconnect => "bye",
            ChatCommand::Unknown(verb) => verb.trim_start_matches(COMMAND_PREFIX),
        }
    }
}

impl std::fmt::Display for ChatCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatCommand::JoinRoom(id) => write!(f, "/join {id}"),
            ChatCommand::Whisper { target, text } => write!(f, "/whisper {target} {text}"),
            ChatCommand::Unknown(verb) => write!(f, "{verb}"),
            other => write!(f, "/{}", other.name()),
        }
    }
}

/// Parse a chat input line into a message or command.
///
/// Tokens are separated by single spaces and trailing empty tokens are
/// dropped, so `"/join "` has no room argument. Verbs are case-sensitive.
pub fn parse_input(input: &str) -> ChatInput {
    if !input.starts_with(COMMAND_PREFIX) {
        return ChatInput::Message(input.to_string());
    }

    let mut parts: Vec<&str> = input.split(' ').collect();
    while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }

    let verb = parts[0];
    let args = &parts[1..];

    let command = match verb {
        "/list" => ChatCommand::ListRooms,
        "/create" => ChatCommand::CreateRoom,
        "/join" => match args.first().and_then(|id| id.parse::<RoomId>().ok()) {
            Some(id) => ChatCommand::JoinRoom(id),
            None => ChatCommand::Malformed(Usage::Join),
        },
        "/exit" => ChatCommand::ExitRoom,
        "/users" => ChatCommand::ListUsers,
        "/roomusers" => ChatCommand::ListRoomUsers,
        "/whisper" => {
            if args.len() < 2 {
                ChatCommand::Malformed(Usage::Whisper)
            } else {
                ChatCommand::Whisper {
                    target: args[0].to_string(),
                    text: args[1..].join(" ").trim().to_string(),
                }
            }
        }
        "/bye" => ChatCommand::Disconnect,
        _ => ChatCommand::Unknown(verb.to_string()),
    };

    ChatInput::Command(command)
}

/// Chat command information for help display.
pub struct CommandInfo {
    /// Command syntax.
    pub syntax: &'static str,
    /// Command description.
    pub description: &'static str,
}

/// Get all available command information.
pub fn get_command_help() -> Vec<CommandInfo> {
    vec![
        CommandInfo {
            syntax: "/list",
            description: "Show available rooms",
        },
        CommandInfo {
            syntax: "/create",
            description: "Create a new room",
        },
        CommandInfo {
            syntax: "/join [roomNumber]",
            description: "Join a room",
        },
        CommandInfo {
            syntax: "/exit",
            description: "Leave the current room or exit the chat",
        },
        CommandInfo {
            syntax: "/users",
            description: "List all users",
        },
        CommandInfo {
            syntax: "/roomusers",
            description: "List users in the current room",
        },
        CommandInfo {
            syntax: "/whisper [nickname] [message]",
            description: "Send a private message to a user",
        },
        CommandInfo {
            syntax: "/bye",
            description: "Disconnect from the chat",
        },
    ]
}

/// Lines sent to a client right after it picks a nickname.
pub fn command_list() -> Vec<String> {
    let mut lines = vec!["Available commands:".to_string()];
    lines.extend(
        get_command_help()
            .into_iter()
            .map(|info| format!("{} - {}", info.syntax, info.description)),
    );
    lines
}
