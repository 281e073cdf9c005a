use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use storefront_auth::permissions;
use storefront_core::CategoryId;

use crate::app::dto::{self, CategoryResponse};
use crate::app::errors::ApiResult;
use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

/// Reads are public; writes need `catalog.write`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/:id",
            get(get_category).patch(update_category).delete(delete_category),
        )
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Json<Vec<CategoryResponse>>> {
    let categories = services.list_categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CategoryResponse>> {
    let category = services.get_category(CategoryId::from_uuid(id)).await?;
    Ok(Json(category.into()))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    ValidatedJson(body): ValidatedJson<dto::CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<CategoryResponse>)> {
    authz::require(&user, &permissions::CATALOG_WRITE)?;
    let category = services.create_category(body.into()).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<dto::UpdateCategoryRequest>,
) -> ApiResult<Json<CategoryResponse>> {
    authz::require(&user, &permissions::CATALOG_WRITE)?;
    let category = services.update_category(CategoryId::from_uuid(id), body.into()).await?;
    Ok(Json(category.into()))
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    authz::require(&user, &permissions::CATALOG_WRITE)?;
    services.delete_category(CategoryId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
