use std::sync::Arc;

use crate::config::websocket::AppConfig;
use crate::services::notification_service::{NotificationService, NotificationStore};
use crate::services::notifier::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub notifier: Notifier,
    pub notifications: NotificationService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn NotificationStore>) -> Self {
        let notifier = Notifier::new();
        let notifications = NotificationService::new(
            store,
            notifier.clone(),
            config.default_page_size,
            config.max_page_size,
        );
        Self {
            config: Arc::new(config),
            notifier,
            notifications,
        }
    }
}
