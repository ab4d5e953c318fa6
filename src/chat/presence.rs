//! Presence registry: who is connected and how to reach them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Sending half of a client's outbound line queue.
///
/// Each line is written to the socket by the owning session's writer task.
pub type Outbox = mpsc::UnboundedSender<String>;

/// Receiving half matching [`Outbox`].
pub type Inbox = mpsc::UnboundedReceiver<String>;

/// Create a connected outbox/inbox pair.
pub fn outbox() -> (Outbox, Inbox) {
    mpsc::unbounded_channel()
}

/// Registry entry for a connected client.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    /// Where lines for this client go.
    pub outbox: Outbox,
    /// Session that owns the connection.
    pub session_id: Uuid,
    /// When the client picked its nickname.
    pub connected_at: DateTime<Utc>,
}

impl ClientHandle {
    /// Create a handle stamped with the current time.
    pub fn new(outbox: Outbox, session_id: Uuid) -> Self {
        Self {
            outbox,
            session_id,
            connected_at: Utc::now(),
        }
    }
}

/// Nickname to outbound channel lookup shared by all sessions.
///
/// The registry does not own connections; it only holds the handles the
/// sessions registered.
pub struct PresenceRegistry {
    clients: RwLock<HashMap<String, ClientHandle>>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Register `nickname`, replacing any client already using it.
    ///
    /// Returns the displaced handle. The displaced client stays connected
    /// but no longer receives anything addressed to the nickname.
    pub async fn register(
        &self,
        nickname: impl Into<String>,
        handle: ClientHandle,
    ) -> Option<ClientHandle> {
        let nickname = nickname.into();
        let session_id = handle.session_id;
        let displaced = self.clients.write().await.insert(nickname.clone(), handle);
        if let Some(old) = &displaced {
            warn!(
                %nickname,
                displaced_session = %old.session_id,
                new_session = %session_id,
                "nickname already in use; previous client is no longer reachable"
            );
        }
        displaced
    }

    /// Remove `nickname`. No-op if absent.
    pub async fn unregister(&self, nickname: &str) -> Option<ClientHandle> {
        self.clients.write().await.remove(nickname)
    }

    /// Look up the outbox registered for `nickname`.
    pub async fn lookup(&self, nickname: &str) -> Option<Outbox> {
        self.clients
            .read()
            .await
            .get(nickname)
            .map(|handle| handle.outbox.clone())
    }

    /// Whether `nickname` is registered.
    pub async fn contains(&self, nickname: &str) -> bool {
        self.clients.read().await.contains_key(nickname)
    }

    /// Every registered nickname, in no particular order.
    pub async fn all_nicknames(&self) -> Vec<String> {
        self.clients.read().await.keys().cloned().collect()
    }

    /// Number of registered clients.
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Whether no clients are registered.
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Push `line` to `nickname`.
    ///
    /// Returns false if the nickname is unknown or its connection is gone.
    pub async fn send_to(&self, nickname: &str, line: impl Into<String>) -> bool {
        match self.lookup(nickname).await {
            Some(outbox) => deliver(&outbox, nickname, line.into()),
            None => false,
        }
    }

    /// Push `line` to each nickname in `recipients` that is registered.
    ///
    /// Returns the number of clients the line was queued for.
    pub async fn send_to_many(&self, recipients: &[String], line: &str) -> usize {
        let clients = self.clients.read().await;
        recipients
            .iter()
            .filter_map(|nickname| clients.get(nickname).map(|h| (nickname, h)))
            .filter(|(nickname, handle)| deliver(&handle.outbox, nickname, line.to_string()))
            .count()
    }

    /// Push `line` to every registered client.
    pub async fn send_to_all(&self, line: &str) -> usize {
        let clients = self.clients.read().await;
        clients
            .iter()
            .filter(|(nickname, handle)| deliver(&handle.outbox, nickname, line.to_string()))
            .count()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(outbox: &Outbox, nickname: &str, line: String) -> bool {
    match outbox.send(line) {
        Ok(()) => true,
        Err(_) => {
            debug!(%nickname, "dropping line for closed connection");
            false
        }
    }
}
