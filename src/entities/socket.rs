use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tungstenite::Message;
use uuid::Uuid;

/// Claims carried by the bearer/query token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketAuth {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error)]
#[error("connection {0} is closed")]
pub struct SendError(pub ConnectionId);

/// One open live-update channel. Identity is [`Connection::id`], not the
/// handle's address, so clones of the same handle count as one connection.
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Queue a text frame. Must not wait on the peer.
    fn send(&self, text: &str) -> Result<(), SendError>;
}

/// Handle to a websocket whose sink is drained by a dedicated writer task.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Message>,
}

impl SocketHandle {
    pub fn new(outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: ConnectionId::new(),
            outbound,
        }
    }
}

impl Connection for SocketHandle {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, text: &str) -> Result<(), SendError> {
        self.outbound
            .send(Message::Text(text.to_owned()))
            .map_err(|_| SendError(self.id))
    }
}
