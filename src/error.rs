//! Error types for chatrelay.

use thiserror::Error;

use crate::chat::RoomId;

/// Common error type for chatrelay.
///
/// The `Display` text of the user-facing variants is sent verbatim to the
/// client that caused them.
#[derive(Error, Debug)]
pub enum RelayError {
    /// I/O error on a client connection or the listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested room was never created.
    #[error("Room does not exist.")]
    RoomNotFound(RoomId),

    /// No client is registered under the nickname.
    #[error("User {0} is not online.")]
    UserOffline(String),
}

impl RelayError {
    /// Whether this error is reported back to the client instead of
    /// ending its session.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, RelayError::RoomNotFound(_) | RelayError::UserOffline(_))
    }
}

/// Result type alias for chatrelay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
