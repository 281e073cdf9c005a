//! Back-office order handling and shipping.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use storefront_auth::permissions;
use storefront_core::{OrderId, PageRequest, ParcelId};
use storefront_sales::OrderStatus;
use storefront_shipping::ParcelStatus;

use crate::app::dto::{self, OrderResponse, PageResponse, ParcelResponse};
use crate::app::errors::ApiResult;
use crate::app::extract::ValidatedJson;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id/status", patch(set_order_status))
        .route("/orders/:id/refund", post(refund_order))
        .route("/parcels", post(create_parcel))
        .route("/parcels/:id/status", patch(update_parcel_status))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Query(query): Query<dto::OrderListQuery>,
) -> ApiResult<Json<PageResponse<OrderResponse>>> {
    authz::require(&user, &permissions::ORDERS_MANAGE)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;
    let page = services
        .list_orders(status, PageRequest::new(query.page, query.per_page))
        .await?;
    Ok(Json(PageResponse::from_page(page)))
}

pub async fn set_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<dto::SetOrderStatusRequest>,
) -> ApiResult<Json<OrderResponse>> {
    authz::require(&user, &permissions::ORDERS_MANAGE)?;
    let status: OrderStatus = body.status.parse()?;
    let order = services.set_order_status(OrderId::from_uuid(id), status).await?;
    Ok(Json(order.into()))
}

pub async fn refund_order(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    authz::require(&user, &permissions::ORDERS_MANAGE)?;
    let order = services.refund_order(OrderId::from_uuid(id)).await?;
    Ok(Json(order.into()))
}

pub async fn create_parcel(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    ValidatedJson(body): ValidatedJson<dto::CreateParcelRequest>,
) -> ApiResult<(StatusCode, Json<ParcelResponse>)> {
    authz::require(&user, &permissions::PARCELS_MANAGE)?;
    let parcel = services
        .create_parcel(OrderId::from_uuid(body.order_id), &body.carrier, &body.tracking_number)
        .await?;
    Ok((StatusCode::CREATED, Json(parcel.into())))
}

pub async fn update_parcel_status(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<dto::ParcelStatusRequest>,
) -> ApiResult<Json<ParcelResponse>> {
    authz::require(&user, &permissions::PARCELS_MANAGE)?;
    let status: ParcelStatus = body.status.parse()?;
    let parcel = services
        .update_parcel_status(ParcelId::from_uuid(id), status, body.location, body.note)
        .await?;
    Ok(Json(parcel.into()))
}
