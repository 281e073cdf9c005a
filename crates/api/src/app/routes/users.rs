use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;

use storefront_auth::{permissions, Role};
use storefront_core::UserId;

use crate::app::dto::{self, PageResponse, UserResponse};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/me", patch(update_me))
        .route("/:id", get(get_user).delete(delete_user))
        .route("/:id/role", patch(set_role))
}

pub async fn update_me(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    ValidatedJson(body): ValidatedJson<dto::UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    authz::require(&user, &permissions::PROFILE_MANAGE)?;
    let updated = services.update_profile(user.user_id(), body.into()).await?;
    Ok(Json(updated.into()))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Query(query): Query<dto::PageQuery>,
) -> ApiResult<Json<PageResponse<UserResponse>>> {
    authz::require(&user, &permissions::USERS_MANAGE)?;
    let page = services.list_users(query.request()).await?;
    Ok(Json(PageResponse::from_page(page)))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    authz::require(&user, &permissions::USERS_MANAGE)?;
    let found = services.get_user(UserId::from_uuid(id)).await?;
    Ok(Json(found.into()))
}

pub async fn set_role(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<dto::SetRoleRequest>,
) -> ApiResult<Json<UserResponse>> {
    authz::require(&user, &permissions::USERS_MANAGE)?;
    let role: Role = body.role.parse().map_err(ApiError::Validation)?;
    let updated = services.set_role(user.user_id(), UserId::from_uuid(id), role).await?;
    Ok(Json(updated.into()))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authz::require(&user, &permissions::USERS_MANAGE)?;
    services.delete_user(user.user_id(), UserId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
