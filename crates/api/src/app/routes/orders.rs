use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use storefront_auth::permissions;
use storefront_core::{AddressId, OrderId};

use crate::app::dto::{self, OrderResponse, PageResponse, ParcelResponse, PaymentResponse};
use crate::app::errors::ApiResult;
use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", post(checkout).get(my_orders))
        .route("/:id", get(get_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/payments", get(order_payments))
        .route("/:id/parcel", get(order_parcel))
}

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    ValidatedJson(body): ValidatedJson<dto::CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    authz::require(&user, &permissions::ORDERS_PLACE)?;
    let order = services
        .checkout(user.user_id(), AddressId::from_uuid(body.address_id), body.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

pub async fn my_orders(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Query(query): Query<dto::PageQuery>,
) -> ApiResult<Json<PageResponse<OrderResponse>>> {
    let page = services.my_orders(user.user_id(), query.request()).await?;
    Ok(Json(PageResponse::from_page(page)))
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = services.order_for(&user, OrderId::from_uuid(id)).await?;
    Ok(Json(order.into()))
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = services.cancel_order(&user, OrderId::from_uuid(id)).await?;
    Ok(Json(order.into()))
}

pub async fn order_payments(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<PaymentResponse>>> {
    let payments = services.order_payments(&user, OrderId::from_uuid(id)).await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}

pub async fn order_parcel(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ParcelResponse>> {
    let parcel = services.order_parcel(&user, OrderId::from_uuid(id)).await?;
    Ok(Json(parcel.into()))
}
