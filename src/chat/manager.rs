//! Room registry for chatrelay.
//!
//! Owns every room and the nickname → room index, and fans room traffic out
//! through the [`PresenceRegistry`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::message::{joined_room, ChatMessage};
use super::presence::{Outbox, PresenceRegistry};
use super::room::{Room, RoomId};
use crate::{RelayError, Result};

/// Rooms plus the counter that numbers them.
struct RoomTable {
    next_id: RoomId,
    rooms: BTreeMap<RoomId, Arc<Room>>,
}

/// Registry of rooms and memberships.
///
/// This is shared across all sessions. Rooms are never removed, even once
/// empty. Membership changes are serialized on the membership index and
/// lock in the order index → room table → room members, so the index and
/// the member lists always agree.
pub struct RoomRegistry {
    presence: Arc<PresenceRegistry>,
    rooms: RwLock<RoomTable>,
    /// Nickname → room it is currently in.
    memberships: Mutex<HashMap<String, RoomId>>,
}

impl RoomRegistry {
    /// Create an empty registry that delivers through `presence`.
    pub fn new(presence: Arc<PresenceRegistry>) -> Self {
        Self {
            presence,
            rooms: RwLock::new(RoomTable {
                next_id: 1,
                rooms: BTreeMap::new(),
            }),
            memberships: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new empty room and return its id.
    pub async fn create_room(&self) -> RoomId {
        let mut table = self.rooms.write().await;
        let id = table.next_id;
        table.next_id += 1;
        table.rooms.insert(id, Arc::new(Room::new(id)));
        info!(room_id = id, "room created");
        id
    }

    /// Get a room by ID.
    pub async fn get_room(&self, id: RoomId) -> Option<Arc<Room>> {
        self.rooms.read().await.rooms.get(&id).cloned()
    }

    /// Ids of every room ever created, oldest first.
    pub async fn list_room_ids(&self) -> Vec<RoomId> {
        self.rooms.read().await.rooms.keys().copied().collect()
    }

    /// Get the number of rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.rooms.len()
    }

    /// Members of a room in join order, or None if the room does not exist.
    pub async fn members_of(&self, id: RoomId) -> Option<Vec<String>> {
        let room = self.get_room(id).await?;
        Some(room.members().await)
    }

    /// Room `nickname` is currently in.
    pub async fn current_room(&self, nickname: &str) -> Option<RoomId> {
        self.memberships.lock().await.get(nickname).copied()
    }

    /// Move `nickname` into room `id`.
    ///
    /// Leaves the nickname's current room first (announcing the departure
    /// there), replies `Joined room N` on `outbox`, then announces the join
    /// to everyone in the room including the joiner. Joining the room the
    /// nickname is already in keeps the membership as is but still sends the
    /// reply and the announcement.
    pub async fn join(&self, nickname: &str, id: RoomId, outbox: &Outbox) -> Result<RoomId> {
        let room = self
            .get_room(id)
            .await
            .ok_or(RelayError::RoomNotFound(id))?;

        let mut memberships = self.memberships.lock().await;
        let previous = memberships.get(nickname).copied().filter(|&p| p != id);

        if let Some(previous_id) = previous {
            memberships.remove(nickname);
            if let Some(previous_room) = self.get_room(previous_id).await {
                previous_room.remove(nickname).await;
            }
        }
        room.add(nickname).await;
        memberships.insert(nickname.to_string(), id);
        drop(memberships);

        if let Some(previous_id) = previous {
            info!(%nickname, room_id = previous_id, "left room");
            self.announce(previous_id, &ChatMessage::leave(nickname))
                .await;
        }
        info!(%nickname, room_id = id, "joined room");

        let _ = outbox.send(joined_room(id));
        self.announce(id, &ChatMessage::join(nickname)).await;
        Ok(id)
    }

    /// Take `nickname` out of its room and tell the remaining members.
    ///
    /// Returns the room left, or None (doing nothing) if the nickname was
    /// not in a room.
    pub async fn leave(&self, nickname: &str) -> Option<RoomId> {
        let mut memberships = self.memberships.lock().await;
        let id = memberships.remove(nickname)?;
        if let Some(room) = self.get_room(id).await {
            room.remove(nickname).await;
        }
        drop(memberships);

        info!(%nickname, room_id = id, "left room");
        self.announce(id, &ChatMessage::leave(nickname)).await;
        Some(id)
    }

    /// Send `text` from `sender` to every member of the sender's room,
    /// the sender included.
    ///
    /// Returns the number of members reached; 0 if the sender is in no room.
    pub async fn broadcast_from(&self, sender: &str, text: &str) -> usize {
        let Some(id) = self.current_room(sender).await else {
            debug!(%sender, "dropping message from client outside any room");
            return 0;
        };
        self.announce(id, &ChatMessage::new(sender, text)).await
    }

    /// Deliver `message` to a snapshot of the room's current members.
    async fn announce(&self, id: RoomId, message: &ChatMessage) -> usize {
        let Some(members) = self.members_of(id).await else {
            return 0;
        };
        self.presence
            .send_to_many(&members, &message.format())
            .await
    }
}
