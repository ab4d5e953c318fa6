//! Shared server state handed to every session.

use std::sync::Arc;

use tracing::info;

use crate::chat::{PresenceRegistry, RoomRegistry, SHUTTING_DOWN};

/// Process-wide relay state.
///
/// Created once at startup and cloned (cheaply) into each session. The two
/// registries are the only state sessions share.
#[derive(Clone)]
pub struct ServerContext {
    presence: Arc<PresenceRegistry>,
    rooms: Arc<RoomRegistry>,
}

impl ServerContext {
    /// Create a context with empty registries.
    pub fn new() -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let rooms = Arc::new(RoomRegistry::new(Arc::clone(&presence)));
        Self { presence, rooms }
    }

    /// Presence registry.
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Room registry.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Tell every connected client the server is going away.
    pub async fn shutdown(&self) {
        let notified = self.presence.send_to_all(SHUTTING_DOWN).await;
        let rooms = self.rooms.room_count().await;
        info!(clients = notified, rooms, "relay shutting down");
    }
}

impl Default for ServerContext {
    fn default() -> Self {
        Self::new()
    }
}
