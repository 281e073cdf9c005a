use std::sync::Arc;

use axum::{body::Bytes, extract::Extension, routing::post, Json, Router};

use crate::app::dto::WebhookResponse;
use crate::app::errors::ApiResult;
use crate::app::services::{payments::WebhookOutcome, AppServices};

/// Gateway callbacks; unauthenticated.
pub fn router() -> Router {
    Router::new().route("/payment/yookassa", post(yookassa))
}

/// Known payments always get 200 so YooKassa stops redelivering.
pub async fn yookassa(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let result = match services.handle_yookassa_webhook(&body).await? {
        WebhookOutcome::Applied(_) => "applied",
        WebhookOutcome::Ignored => "ignored",
    };
    Ok(Json(WebhookResponse { result }))
}
