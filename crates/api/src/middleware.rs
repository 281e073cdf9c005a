use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tracing::debug;

use storefront_auth::{JwtValidator, TokenKind, TokenPair};

use crate::app::errors::ApiError;
use crate::context::CurrentUser;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Attach a [`CurrentUser`] when the request carries a valid access token.
///
/// Requests without a token, or with a stale one, continue anonymously;
/// protected routes reject them in [`require_auth`].
pub async fn authenticate(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    if let Some(token) = access_token(req.headers()) {
        match state.jwt.validate(token, TokenKind::Access, Utc::now()) {
            Ok(claims) => {
                req.extensions_mut().insert(CurrentUser::new(claims.sub, claims.role));
            }
            Err(e) => debug!(error = %e, "ignoring invalid access token"),
        }
    }
    next.run(req).await
}

pub async fn require_auth(req: Request, next: Next) -> Response {
    if req.extensions().get::<CurrentUser>().is_none() {
        return ApiError::Unauthorized("authentication required".to_string()).into_response();
    }
    next.run(req).await
}

/// Bearer header first, then the `access_token` cookie.
pub fn access_token(headers: &HeaderMap) -> Option<&str> {
    extract_bearer(headers).or_else(|| cookie(headers, ACCESS_COOKIE))
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` values carrying a freshly issued token pair.
pub fn session_cookies(pair: &TokenPair, secure: bool, now: DateTime<Utc>) -> [HeaderValue; 2] {
    [
        set_cookie(ACCESS_COOKIE, &pair.access_token, (pair.access_expires_at - now).num_seconds(), secure),
        set_cookie(REFRESH_COOKIE, &pair.refresh_token, (pair.refresh_expires_at - now).num_seconds(), secure),
    ]
}

pub fn clear_session_cookies(secure: bool) -> [HeaderValue; 2] {
    [set_cookie(ACCESS_COOKIE, "", 0, secure), set_cookie(REFRESH_COOKIE, "", 0, secure)]
}

fn set_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> HeaderValue {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", max_age.max(0));
    if secure {
        cookie.push_str("; Secure");
    }
    // Tokens are base64url and dots, always valid header characters.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}
