use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use storefront_auth::permissions;
use storefront_core::{ProductId, VariantId};
use storefront_infra::ProductRemoval;

use crate::app::dto::{self, DeleteProductResponse, PageResponse, ProductResponse, VariantResponse};
use crate::app::errors::ApiResult;
use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/:id/variants", post(add_variant))
        .route("/:id/variants/:variant_id", patch(update_variant).delete(delete_variant))
}

fn is_admin(user: &Option<CurrentUser>) -> bool {
    user.as_ref().is_some_and(CurrentUser::is_admin)
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    user: Option<CurrentUser>,
    Query(query): Query<dto::ProductQuery>,
) -> ApiResult<Json<PageResponse<ProductResponse>>> {
    let filter = query.filter()?;
    let page = services.list_products(filter, query.page(), is_admin(&user)).await?;
    Ok(Json(PageResponse::from_page(page)))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    user: Option<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProductResponse>> {
    let product = services.get_product(ProductId::from_uuid(id), is_admin(&user)).await?;
    Ok(Json(product.into()))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    ValidatedJson(body): ValidatedJson<dto::CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<ProductResponse>)> {
    authz::require(&user, &permissions::CATALOG_WRITE)?;
    let product = services.create_product(body.into()).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<dto::UpdateProductRequest>,
) -> ApiResult<Json<ProductResponse>> {
    authz::require(&user, &permissions::CATALOG_WRITE)?;
    let product = services.update_product(ProductId::from_uuid(id), body.into()).await?;
    Ok(Json(product.into()))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteProductResponse>> {
    authz::require(&user, &permissions::CATALOG_WRITE)?;
    let outcome = match services.delete_product(ProductId::from_uuid(id)).await? {
        ProductRemoval::Deleted => "deleted",
        ProductRemoval::Deactivated => "deactivated",
    };
    Ok(Json(DeleteProductResponse { id, outcome }))
}

pub async fn add_variant(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<dto::CreateVariantRequest>,
) -> ApiResult<(StatusCode, Json<VariantResponse>)> {
    authz::require(&user, &permissions::CATALOG_WRITE)?;
    let variant = services.add_variant(ProductId::from_uuid(id), body.into()).await?;
    Ok((StatusCode::CREATED, Json(variant.into())))
}

pub async fn update_variant(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path((id, variant_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(body): ValidatedJson<dto::UpdateVariantRequest>,
) -> ApiResult<Json<VariantResponse>> {
    authz::require(&user, &permissions::CATALOG_WRITE)?;
    let variant = services
        .update_variant(ProductId::from_uuid(id), VariantId::from_uuid(variant_id), body.into())
        .await?;
    Ok(Json(variant.into()))
}

pub async fn delete_variant(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path((id, variant_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    authz::require(&user, &permissions::CATALOG_WRITE)?;
    services
        .delete_variant(ProductId::from_uuid(id), VariantId::from_uuid(variant_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
