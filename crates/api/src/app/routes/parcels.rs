use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::get,
    Json, Router,
};

use crate::app::dto::TrackingResponse;
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/track/:tracking_number", get(track))
}

pub async fn track(
    Extension(services): Extension<Arc<AppServices>>,
    Path(tracking_number): Path<String>,
) -> ApiResult<Json<TrackingResponse>> {
    let parcel = services.track_parcel(&tracking_number).await?;
    Ok(Json(parcel.into()))
}
