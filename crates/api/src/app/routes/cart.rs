use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use storefront_auth::permissions;
use storefront_core::{CartItemId, ProductId, VariantId};

use crate::app::dto::{self, CartResponse};
use crate::app::errors::ApiResult;
use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:id", patch(update_item).delete(remove_item))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
) -> ApiResult<Json<CartResponse>> {
    authz::require(&user, &permissions::CART_MANAGE)?;
    Ok(Json(services.cart(user.user_id()).await?.into()))
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    ValidatedJson(body): ValidatedJson<dto::AddCartItemRequest>,
) -> ApiResult<Json<CartResponse>> {
    authz::require(&user, &permissions::CART_MANAGE)?;
    let cart = services
        .add_to_cart(
            user.user_id(),
            ProductId::from_uuid(body.product_id),
            body.variant_id.map(VariantId::from_uuid),
            body.quantity,
        )
        .await?;
    Ok(Json(cart.into()))
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<dto::UpdateCartItemRequest>,
) -> ApiResult<Json<CartResponse>> {
    authz::require(&user, &permissions::CART_MANAGE)?;
    let cart = services
        .set_cart_quantity(user.user_id(), CartItemId::from_uuid(id), body.quantity)
        .await?;
    Ok(Json(cart.into()))
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CartResponse>> {
    authz::require(&user, &permissions::CART_MANAGE)?;
    let cart = services.remove_cart_item(user.user_id(), CartItemId::from_uuid(id)).await?;
    Ok(Json(cart.into()))
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
) -> ApiResult<StatusCode> {
    authz::require(&user, &permissions::CART_MANAGE)?;
    services.clear_cart(user.user_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
