//! REST surface for notification records and presence.
//!
//! Every response is a JSON envelope: `{ "success": true, "data": ... }` on
//! success, `{ "success": false, "error": ... }` otherwise.

use chrono::Utc;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::form_urlencoded;
use uuid::Uuid;

use crate::entities::notification::{NewNotification, NotificationType};
use crate::entities::socket::SocketAuth;
use crate::error::ApiError;
use crate::services::auth::bearer_claims;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct CreateNotificationBody {
    recipient: String,
    #[serde(rename = "type")]
    kind: NotificationType,
    #[serde(default)]
    post: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Default, PartialEq)]
struct Page {
    limit: Option<usize>,
    skip: Option<usize>,
}

pub async fn route(req: Request<Incoming>, state: AppState) -> Response<Full<Bytes>> {
    match dispatch(req, state).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn dispatch(req: Request<Incoming>, state: AppState) -> Result<Response<Full<Bytes>>, ApiError> {
    let method = req.method().clone();
    let path = req.uri().path().trim_end_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (&method, segments.as_slice()) {
        (&Method::GET, []) => ok(json!({
            "message": "Blog notification service is running",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        (&Method::GET, ["health"]) => ok(json!({
            "status": "ok",
            "timestamp": Utc::now().to_rfc3339(),
        })),
        (&Method::GET, ["notifications"]) => {
            let user = authenticate(&req, &state)?;
            let page = parse_page(req.uri().query())?;
            let data = state
                .notifications
                .list(&user.user_id, page.limit, page.skip)
                .await?;
            ok(json!({ "success": true, "data": data }))
        }
        (&Method::GET, ["notifications", "unread-count"]) => {
            let user = authenticate(&req, &state)?;
            let count = state.notifications.unread_count(&user.user_id).await?;
            ok(json!({ "success": true, "data": { "count": count } }))
        }
        (&Method::POST, ["notifications"]) => {
            let user = authenticate(&req, &state)?;
            let body: CreateNotificationBody = read_json(req).await?;
            let created = state
                .notifications
                .create_notification(NewNotification {
                    recipient: body.recipient,
                    sender: user.user_id,
                    kind: body.kind,
                    post: body.post,
                    comment: body.comment,
                })
                .await?;
            let (data, delivered) = match created {
                Some(dispatched) => (json!(dispatched.notification), dispatched.delivered),
                None => (Value::Null, false),
            };
            ok(json!({ "success": true, "data": data, "delivered": delivered }))
        }
        (&Method::PATCH, ["notifications", "read-all"]) => {
            let user = authenticate(&req, &state)?;
            let updated = state.notifications.mark_all_as_read(&user.user_id).await?;
            ok(json!({
                "success": true,
                "message": "All notifications marked as read",
                "data": { "updated": updated },
            }))
        }
        (&Method::PATCH, ["notifications", id, "read"]) => {
            let user = authenticate(&req, &state)?;
            let id = parse_id(id)?;
            let notification = state
                .notifications
                .mark_as_read(id, &user.user_id)
                .await?
                .ok_or(ApiError::NotFound("Notification not found"))?;
            ok(json!({ "success": true, "data": notification }))
        }
        (&Method::DELETE, ["notifications", id]) => {
            let user = authenticate(&req, &state)?;
            let id = parse_id(id)?;
            if !state.notifications.delete(id, &user.user_id).await? {
                return Err(ApiError::NotFound("Notification not found"));
            }
            ok(json!({ "success": true, "message": "Notification deleted" }))
        }
        (&Method::GET, ["presence"]) => {
            authenticate(&req, &state)?;
            let count = state.notifier.online_user_count().await;
            ok(json!({ "success": true, "data": { "count": count } }))
        }
        (&Method::GET, ["presence", user_id]) => {
            authenticate(&req, &state)?;
            let online = state.notifier.is_online(user_id).await;
            ok(json!({ "success": true, "data": { "userId": user_id, "online": online } }))
        }
        _ => Err(ApiError::NotFound("Not found")),
    }
}

fn authenticate(req: &Request<Incoming>, state: &AppState) -> Result<SocketAuth, ApiError> {
    Ok(bearer_claims(req.headers(), &state.config.jwt_secret)?)
}

fn ok(body: Value) -> Result<Response<Full<Bytes>>, ApiError> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(Full::new(Bytes::from(body.to_string())))?)
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid notification id: {raw}")))
}

fn parse_page(query: Option<&str>) -> Result<Page, ApiError> {
    let mut page = Page::default();
    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        let slot = match &*key {
            "limit" => &mut page.limit,
            "skip" => &mut page.skip,
            _ => continue,
        };
        let parsed = value
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("{key} must be a non-negative integer")))?;
        *slot = Some(parsed);
    }
    Ok(page)
}

async fn read_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T, ApiError> {
    let bytes = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Unreadable request body: {e}")))?
        .to_bytes();
    serde_json::from_slice(&bytes).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))
}
