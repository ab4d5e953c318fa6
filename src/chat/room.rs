//! Chat room implementation for chatrelay.
//!
//! A room is just an id and its member list. Announcements and fan-out go
//! through [`RoomRegistry`](super::RoomRegistry), which owns the rooms.

use tokio::sync::RwLock;

/// Room identifier. Allocated from 1 upwards and never reused.
///
/// Signed: a negative id typed by a client parses, and names a room that
/// never exists.
pub type RoomId = i64;

/// A chat room.
///
/// Members are kept in the order they joined. The list sits behind its own
/// lock so that fan-out over one room never waits on another room.
#[derive(Debug)]
pub struct Room {
    /// Room ID.
    id: RoomId,
    /// Member nicknames in join order.
    members: RwLock<Vec<String>>,
}

impl Room {
    /// Create an empty room.
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            members: RwLock::new(Vec::new()),
        }
    }

    /// Get the room ID.
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Copy of the current member list.
    ///
    /// Broadcasts iterate over this copy, so members can join or leave while
    /// a broadcast is in flight.
    pub async fn members(&self) -> Vec<String> {
        self.members.read().await.clone()
    }

    /// Add a member.
    ///
    /// Returns true if the nickname was added, false if already present.
    pub(crate) async fn add(&self, nickname: &str) -> bool {
        let mut members = self.members.write().await;
        if members.iter().any(|m| m == nickname) {
            return false;
        }
        members.push(nickname.to_string());
        true
    }

    /// Remove a member.
    ///
    /// Returns true if the nickname was removed, false if not in the room.
    pub(crate) async fn remove(&self, nickname: &str) -> bool {
        let mut members = self.members.write().await;
        match members.iter().position(|m| m == nickname) {
            Some(index) => {
                members.remove(index);
                true
            }
            None => false,
        }
    }
}
