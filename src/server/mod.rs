//! Chat relay server module.
//!
//! This module provides the TCP listener, the per-connection session and
//! the state the sessions share.

mod context;
mod listener;
mod session;

pub use context::ServerContext;
pub use listener::{ConnectionPermit, RelayServer};
pub use session::{handle_connection, ChatSession, SessionState};
