pub mod config;
pub mod entities;
pub mod error;
pub mod services;
pub mod state;

use std::io;
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::error::BoxError;
use crate::services::socket_service::handle_request;
use crate::state::AppState;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How long to pause after a failed `accept`. Errors tied to a single
/// incoming connection retry at once; anything else (fd exhaustion and the
/// like) backs off so the loop does not spin.
fn accept_backoff(err: &io::Error) -> Option<Duration> {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

/// Accept loop: one task per TCP connection, upgrades allowed. Accept
/// failures are logged and retried, never returned.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), BoxError> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                if let Some(pause) = accept_backoff(&e) {
                    tokio::time::sleep(pause).await;
                }
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::task::spawn(async move {
            if let Err(err) = hyper::server::conn::http1::Builder::new()
                .serve_connection(
                    io,
                    service_fn(move |req| handle_request(req, state.clone())),
                )
                .with_upgrades()
                .await
            {
                tracing::debug!(%peer, error = ?err, "error serving connection");
            }
        });
    }
}
