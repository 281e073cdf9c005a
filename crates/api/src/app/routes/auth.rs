use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use crate::app::dto::{self, AuthResponse, UserResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::context::CurrentUser;
use crate::middleware::{self, REFRESH_COOKIE};

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ValidatedJson(body): ValidatedJson<dto::RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let user = services.register(body.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ValidatedJson(body): ValidatedJson<dto::LoginRequest>,
) -> ApiResult<Response> {
    let (user, tokens) = services.login(&body.email, &body.password).await?;
    let [access, refresh] = middleware::session_cookies(&tokens, services.settings.cookie_secure, Utc::now());
    Ok((
        AppendHeaders([(SET_COOKIE, access), (SET_COOKIE, refresh)]),
        Json(AuthResponse::new(user, tokens)),
    )
        .into_response())
}

/// The refresh token comes from the body, or from the cookie set at login.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: Option<Json<dto::RefreshRequest>>,
) -> ApiResult<Response> {
    let from_body = body.and_then(|Json(b)| b.refresh_token);
    let token = from_body
        .as_deref()
        .or_else(|| middleware::cookie(&headers, REFRESH_COOKIE))
        .ok_or_else(|| ApiError::Unauthorized("refresh token required".to_string()))?;

    let (user, tokens) = services.refresh(token).await?;
    let [access, refresh] = middleware::session_cookies(&tokens, services.settings.cookie_secure, Utc::now());
    Ok((
        AppendHeaders([(SET_COOKIE, access), (SET_COOKIE, refresh)]),
        Json(AuthResponse::new(user, tokens)),
    )
        .into_response())
}

pub async fn logout(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let [access, refresh] = middleware::clear_session_cookies(services.settings.cookie_secure);
    (
        StatusCode::NO_CONTENT,
        AppendHeaders([(SET_COOKIE, access), (SET_COOKIE, refresh)]),
    )
        .into_response()
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
) -> ApiResult<Json<UserResponse>> {
    let user = services.current_user(user.user_id()).await?;
    Ok(Json(user.into()))
}
