use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use storefront_auth::permissions;
use storefront_core::{OrderId, PaymentId};

use crate::app::dto::{self, PaymentResponse};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_payment))
        .route("/:id", get(get_payment))
}

pub async fn create_payment(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Json(body): Json<dto::CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<PaymentResponse>)> {
    authz::require(&user, &permissions::PAYMENTS_CREATE)?;
    let payment = services.create_payment(&user, OrderId::from_uuid(body.order_id)).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

pub async fn get_payment(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PaymentResponse>> {
    let payment = services.payment_for(&user, PaymentId::from_uuid(id)).await?;
    Ok(Json(payment.into()))
}
