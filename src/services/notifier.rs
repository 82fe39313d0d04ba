use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::entities::notification::ServerMessage;
use crate::entities::registry::{ConnectionRef, ConnectionRegistry};
use crate::entities::socket::ConnectionId;

/// Shared front for the connection registry: the transport registers and
/// unregisters sockets, producers push notifications through [`Notifier::deliver`].
///
/// Cloning is cheap; all clones share one registry.
#[derive(Clone, Default)]
pub struct Notifier {
    registry: Arc<Mutex<ConnectionRegistry>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user_id: &str, connection: ConnectionRef) {
        self.registry.lock().await.register(user_id, connection);
    }

    pub async fn unregister(&self, user_id: &str, id: ConnectionId) {
        self.registry.lock().await.unregister(user_id, id);
    }

    /// Push `notification` to every open connection of `user_id`.
    ///
    /// Returns `false` without touching any socket when the user has no
    /// connection, `true` otherwise. A failed send, or a payload that cannot
    /// be encoded, is logged and skipped; connections stay registered until
    /// the transport closes them.
    pub async fn deliver<T: Serialize>(&self, user_id: &str, notification: &T) -> bool {
        let connections = self.registry.lock().await.connections(user_id);
        if connections.is_empty() {
            return false;
        }

        let message = match serde_json::to_string(&ServerMessage::Notification { data: notification }) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(user = %user_id, error = %e, "failed to encode notification");
                return true;
            }
        };

        for connection in &connections {
            if let Err(e) = connection.send(&message) {
                tracing::warn!(user = %user_id, error = %e, "error sending notification");
            }
        }
        tracing::debug!(user = %user_id, connections = connections.len(), "notification pushed");
        true
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.registry.lock().await.is_online(user_id)
    }

    pub async fn connection_count(&self, user_id: &str) -> usize {
        self.registry.lock().await.connection_count(user_id)
    }

    pub async fn online_user_count(&self) -> usize {
        self.registry.lock().await.online_user_count()
    }

    pub async fn online_users(&self) -> Vec<String> {
        self.registry.lock().await.online_users()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::socket::{Connection, SendError};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        id: ConnectionId,
        fail: bool,
        sent: StdMutex<Vec<String>>,
    }

    impl Recorder {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Connection for Recorder {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn send(&self, text: &str) -> Result<(), SendError> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.fail {
                Err(SendError(self.id))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn deliver_to_offline_user_sends_nothing() {
        let notifier = Notifier::new();
        let bystander = Arc::new(Recorder::default());
        notifier.register("bob", bystander.clone()).await;

        assert!(!notifier.deliver("alice", &json!({ "type": "follow" })).await);
        assert!(bystander.sent().is_empty());
    }

    #[tokio::test]
    async fn fan_out_follows_registration() {
        let notifier = Notifier::new();
        let c1 = Arc::new(Recorder::default());
        let c2 = Arc::new(Recorder::default());
        notifier.register("alice", c1.clone()).await;
        notifier.register("alice", c2.clone()).await;

        let payload = json!({ "type": "post_like", "sender": "bob" });
        assert!(notifier.deliver("alice", &payload).await);
        assert!(notifier.is_online("alice").await);

        let expected = format!(r#"{{"type":"notification","data":{payload}}}"#);
        assert_eq!(c1.sent(), vec![expected.clone()]);
        assert_eq!(c2.sent(), vec![expected.clone()]);

        notifier.unregister("alice", c1.id()).await;
        assert!(notifier.deliver("alice", &payload).await);
        assert_eq!(c1.sent().len(), 1);
        assert_eq!(c2.sent(), vec![expected.clone(), expected]);

        let before = notifier.online_user_count().await;
        notifier.unregister("alice", c2.id()).await;
        assert!(!notifier.is_online("alice").await);
        assert_eq!(notifier.online_user_count().await, before - 1);
        assert!(!notifier.online_users().await.contains(&"alice".to_string()));
    }

    #[tokio::test]
    async fn failing_sockets_do_not_stop_fan_out() {
        let notifier = Notifier::new();
        let broken: Vec<Arc<Recorder>> = (0..3).map(|_| Arc::new(Recorder::failing())).collect();
        for conn in &broken {
            notifier.register("alice", conn.clone()).await;
        }

        assert!(notifier.deliver("alice", &json!({ "type": "comment" })).await);
        for conn in &broken {
            assert_eq!(conn.sent().len(), 1);
        }
        assert!(notifier.is_online("alice").await);

        let healthy = Arc::new(Recorder::default());
        notifier.register("alice", healthy.clone()).await;
        assert!(notifier.deliver("alice", &json!({ "type": "comment" })).await);
        assert_eq!(healthy.sent().len(), 1);
    }

    #[tokio::test]
    async fn unencodable_payload_still_reports_online_recipient() {
        let notifier = Notifier::new();
        let conn = Arc::new(Recorder::default());
        notifier.register("alice", conn.clone()).await;

        // JSON object keys must be strings, so tuple keys fail to encode.
        let payload: HashMap<(i32, i32), i32> = HashMap::from([((1, 2), 3)]);
        assert!(notifier.deliver("alice", &payload).await);
        assert!(conn.sent().is_empty());
        assert!(notifier.is_online("alice").await);
    }

    #[tokio::test]
    async fn separate_notifiers_are_isolated() {
        let first = Notifier::new();
        let second = Notifier::new();
        first.register("alice", Arc::new(Recorder::default())).await;

        assert!(first.is_online("alice").await);
        assert!(!second.is_online("alice").await);
        assert_eq!(second.online_user_count().await, 0);
    }
}
