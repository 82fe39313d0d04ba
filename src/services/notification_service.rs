use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::entities::notification::{NewNotification, Notification};
use crate::error::StoreError;
use crate::services::notifier::Notifier;

/// Persistence for notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, StoreError>;

    /// Newest first.
    async fn list_for_recipient(
        &self,
        recipient: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn count_unread(&self, recipient: &str) -> Result<usize, StoreError>;

    async fn mark_read(&self, id: Uuid, recipient: &str) -> Result<Option<Notification>, StoreError>;

    async fn mark_all_read(&self, recipient: &str) -> Result<usize, StoreError>;

    async fn delete(&self, id: Uuid, recipient: &str) -> Result<bool, StoreError>;
}

#[derive(Default)]
pub struct InMemoryNotificationStore {
    records: RwLock<HashMap<Uuid, Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<(), StoreError> {
        self.records.write().await.insert(notification.id, notification);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list_for_recipient(
        &self,
        recipient: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<&Notification> = records
            .values()
            .filter(|n| n.recipient == recipient)
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(matching.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn count_unread(&self, recipient: &str) -> Result<usize, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|n| n.recipient == recipient && !n.read)
            .count())
    }

    async fn mark_read(&self, id: Uuid, recipient: &str) -> Result<Option<Notification>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records
            .get_mut(&id)
            .filter(|n| n.recipient == recipient)
            .map(|n| {
                n.mark_read();
                n.clone()
            }))
    }

    async fn mark_all_read(&self, recipient: &str) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        let now = Utc::now();
        let mut updated = 0;
        for n in records.values_mut().filter(|n| n.recipient == recipient && !n.read) {
            n.read = true;
            n.updated_at = now;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete(&self, id: Uuid, recipient: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        if records.get(&id).is_some_and(|n| n.recipient == recipient) {
            records.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[derive(Debug, Clone)]
pub struct Dispatched {
    pub notification: Notification,
    pub delivered: bool,
}

/// Producer-facing entry point: persists notifications and nudges online recipients.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    notifier: Notifier,
    default_page_size: usize,
    max_page_size: usize,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        notifier: Notifier,
        default_page_size: usize,
        max_page_size: usize,
    ) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            store,
            notifier,
            default_page_size: default_page_size.clamp(1, max_page_size),
            max_page_size,
        }
    }

    /// Persists and pushes a notification. Returns `None` when sender and
    /// recipient are the same user.
    pub async fn create_notification(&self, new: NewNotification) -> Result<Option<Dispatched>, StoreError> {
        if new.recipient == new.sender {
            return Ok(None);
        }

        let notification = Notification::from_new(new);
        self.store.insert(notification.clone()).await?;

        let delivered = self.notifier.deliver(&notification.recipient, &notification).await;
        tracing::info!(
            id = %notification.id,
            recipient = %notification.recipient,
            kind = ?notification.kind,
            delivered,
            "notification created"
        );

        Ok(Some(Dispatched {
            notification,
            delivered,
        }))
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Notification>, StoreError> {
        self.store.find_by_id(id).await
    }

    pub async fn list(
        &self,
        user_id: &str,
        limit: Option<usize>,
        skip: Option<usize>,
    ) -> Result<Vec<Notification>, StoreError> {
        let limit = limit
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        self.store
            .list_for_recipient(user_id, limit, skip.unwrap_or(0))
            .await
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<usize, StoreError> {
        self.store.count_unread(user_id).await
    }

    pub async fn mark_as_read(&self, id: Uuid, user_id: &str) -> Result<Option<Notification>, StoreError> {
        self.store.mark_read(id, user_id).await
    }

    pub async fn mark_all_as_read(&self, user_id: &str) -> Result<usize, StoreError> {
        self.store.mark_all_read(user_id).await
    }

    pub async fn delete(&self, id: Uuid, user_id: &str) -> Result<bool, StoreError> {
        self.store.delete(id, user_id).await
    }
}
