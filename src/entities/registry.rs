use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::socket::{Connection, ConnectionId};

pub type ConnectionRef = Arc<dyn Connection>;

/// Maps a user id to the set of live connections opened by that user.
///
/// A user key is present only while its set is non-empty, and a connection
/// is filed under at most one user at a time.
#[derive(Default)]
pub struct ConnectionRegistry {
    users: HashMap<String, HashMap<ConnectionId, ConnectionRef>>,
    owners: HashMap<ConnectionId, String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, user_id: &str, connection: ConnectionRef) {
        let id = connection.id();

        let previous = self
            .owners
            .get(&id)
            .filter(|owner| owner.as_str() != user_id)
            .cloned();
        if let Some(previous) = previous {
            tracing::warn!(connection = %id, from = %previous, to = %user_id, "connection moved between users");
            self.detach(&previous, id);
        }

        let connections = self.users.entry(user_id.to_string()).or_default();
        connections.insert(id, connection);
        self.owners.insert(id, user_id.to_string());

        tracing::info!(user = %user_id, connections = connections.len(), "user connected");
    }

    pub fn unregister(&mut self, user_id: &str, id: ConnectionId) {
        if self.owners.get(&id).map(String::as_str) != Some(user_id) {
            return;
        }
        self.owners.remove(&id);
        let remaining = self.detach(user_id, id);
        tracing::info!(user = %user_id, remaining, "user disconnected");
    }

    /// Connections currently filed under `user_id`, cloned so the caller
    /// can send without holding the registry.
    pub fn connections(&self, user_id: &str) -> Vec<ConnectionRef> {
        self.users
            .get(user_id)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn connection_count(&self, user_id: &str) -> usize {
        self.users.get(user_id).map_or(0, HashMap::len)
    }

    pub fn online_user_count(&self) -> usize {
        self.users.len()
    }

    pub fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.users.keys().cloned().collect();
        users.sort();
        users
    }

    fn detach(&mut self, user_id: &str, id: ConnectionId) -> usize {
        let Some(set) = self.users.get_mut(user_id) else {
            return 0;
        };
        set.remove(&id);
        let remaining = set.len();
        if remaining == 0 {
            self.users.remove(user_id);
        }
        remaining
    }
}
