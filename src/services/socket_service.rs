use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::upgrade::Upgraded;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, instrument, warn};
use tungstenite::Message;

use crate::entities::notification::ServerMessage;
use crate::entities::socket::{Connection, SocketAuth, SocketHandle};
use crate::error::{AuthError, BoxError};
use crate::services::api;
use crate::services::auth::{query_token, verify_token};
use crate::services::notifier::Notifier;
use crate::state::AppState;

#[instrument(skip_all, fields(user = %token_data.user_id))]
async fn handle_websocket_connection(
    websocket: WebSocketStream<TokioIo<Upgraded>>,
    notifier: Notifier,
    token_data: SocketAuth,
) {
    let (mut write, mut read) = websocket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let handle = SocketHandle::new(tx);

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = write.send(message).await {
                debug!(error = %e, "socket write failed");
                break;
            }
        }
        let _ = write.close().await;
    });

    notifier.register(&token_data.user_id, Arc::new(handle.clone())).await;

    match serde_json::to_string(&ServerMessage::connected()) {
        Ok(frame) => {
            if let Err(e) = handle.send(&frame) {
                warn!(error = %e, "failed to send connection confirmation");
            }
        }
        Err(e) => warn!(error = %e, "failed to encode connection confirmation"),
    }

    // Inbound frames carry nothing we act on; tungstenite answers pings itself.
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "socket read failed");
                break;
            }
        }
    }

    notifier.unregister(&token_data.user_id, handle.id()).await;
    drop(handle);
    let _ = writer.await;
}

fn upgrade_rejection(status: StatusCode, reason: &'static str) -> Result<Response<Full<Bytes>>, BoxError> {
    Ok(Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(reason)))?)
}

async fn handle_upgrade(
    req: Request<Incoming>,
    state: AppState,
) -> Result<Response<Full<Bytes>>, BoxError> {
    if !hyper_tungstenite::is_upgrade_request(&req) {
        return upgrade_rejection(StatusCode::BAD_REQUEST, "Not a websocket upgrade request");
    }

    let token_data = match query_token(req.uri().query())
        .and_then(|token| verify_token(&token, &state.config.jwt_secret))
    {
        Ok(claims) => claims,
        Err(AuthError::MissingToken) => {
            return upgrade_rejection(StatusCode::UNAUTHORIZED, "Unauthorized: No token provided");
        }
        Err(e) => {
            info!(error = %e, "websocket authentication failed");
            return upgrade_rejection(
                StatusCode::UNAUTHORIZED,
                "Unauthorized: Token verification failed",
            );
        }
    };

    let (response, websocket) = hyper_tungstenite::upgrade(req, None)?;
    let notifier = state.notifier.clone();

    tokio::spawn(async move {
        match websocket.await {
            Ok(ws) => handle_websocket_connection(ws, notifier, token_data).await,
            Err(e) => warn!(error = %e, "websocket handshake failed"),
        }
    });

    Ok(response.map(|_| Full::new(Bytes::new())))
}

pub async fn handle_request(
    req: Request<Incoming>,
    state: AppState,
) -> Result<Response<Full<Bytes>>, BoxError> {
    debug!(method = %req.method(), path = %req.uri().path(), "request");

    if req.method() == Method::GET && req.uri().path() == "/ws" {
        return handle_upgrade(req, state).await;
    }

    Ok(api::route(req, state).await)
}
