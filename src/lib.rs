//! chatrelay - multi-room line-oriented TCP chat relay.
//!
//! Clients connect over plain TCP, pick a nickname with their first line,
//! and then chat in numbered rooms or whisper to each other by nickname.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;

pub use chat::{ChatCommand, ChatInput, PresenceRegistry, RoomId, RoomRegistry};
pub use config::Config;
pub use error::{RelayError, Result};
pub use server::{ChatSession, RelayServer, ServerContext, SessionState};
