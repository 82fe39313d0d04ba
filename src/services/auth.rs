use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hyper::header::AUTHORIZATION;
use hyper::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use url::form_urlencoded;

use crate::entities::socket::SocketAuth;
use crate::error::AuthError;

pub fn verify_token(token: &str, secret: &str) -> Result<SocketAuth, AuthError> {
    let claims = decode::<SocketAuth>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?
    .claims;

    if claims.user_id.is_empty() {
        return Err(AuthError::MissingUserId);
    }
    Ok(claims)
}

pub fn issue_token(
    secret: &str,
    user_id: &str,
    username: Option<&str>,
    ttl: Duration,
) -> Result<String, AuthError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let claims = SocketAuth {
        user_id: user_id.to_string(),
        username: username.map(str::to_string),
        exp: (now + ttl).as_secs() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Token from the `token` query parameter of a websocket upgrade.
pub fn query_token(query: Option<&str>) -> Result<String, AuthError> {
    form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

pub fn bearer_claims(headers: &HeaderMap, secret: &str) -> Result<SocketAuth, AuthError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)?;
    verify_token(token, secret)
}
