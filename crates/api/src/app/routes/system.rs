use axum::Json;
use utoipa::OpenApi;

use crate::app::dto::HealthResponse;
use crate::app::openapi::ApiDoc;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
