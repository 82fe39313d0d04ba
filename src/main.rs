use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_sockets::config::websocket::AppConfig;
use blog_sockets::error::BoxError;
use blog_sockets::services::notification_service::InMemoryNotificationStore;
use blog_sockets::state::AppState;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    let config = AppConfig::from_env()?;
    let addr = config.bind_addr()?;
    let state = AppState::new(config, Arc::new(InMemoryNotificationStore::new()));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "notification server listening");

    blog_sockets::serve(listener, state).await
}
