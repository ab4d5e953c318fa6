//! Chat module for chatrelay.
//!
//! This module holds the relay's shared state and protocol:
//! - Presence registry (nickname → outbound channel)
//! - Numbered rooms and the room registry (membership, fan-out)
//! - Command parsing (/list, /create, /join, /exit, /users, /roomusers,
//!   /whisper, /bye)
//! - Formatting of every server-to-client line

mod command;
mod manager;
mod message;
mod presence;
mod room;

pub use command::{
    command_list, get_command_help, parse_input, ChatCommand, ChatInput, CommandInfo, Usage,
    COMMAND_PREFIX,
};
pub use manager::RoomRegistry;
pub use message::{
    format_room_users, format_rooms, format_users, joined_room, room_created, unknown_command,
    ChatMessage, MessageType, NOT_IN_ROOM, SHUTTING_DOWN,
};
pub use presence::{outbox, ClientHandle, Inbox, Outbox, PresenceRegistry};
pub use room::{Room, RoomId};
