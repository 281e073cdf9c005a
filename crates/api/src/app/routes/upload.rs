use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Extension, Multipart, Path},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};

use storefront_auth::permissions;

use crate::app::dto::UploadResponse;
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::CurrentUser;

/// Room for multipart framing and the `folder` field on top of the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(max_file_bytes: usize) -> Router {
    Router::new()
        .route("/", post(upload))
        .route("/*key", delete(delete_upload))
        .layer(DefaultBodyLimit::max(max_file_bytes + MULTIPART_OVERHEAD))
}

/// Multipart form with a `file` part and an optional `folder` text part.
pub async fn upload(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    authz::require(&user, &permissions::UPLOADS_WRITE)?;

    let mut file: Option<(String, Bytes)> = None;
    let mut folder: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::Validation("file part has no content type".to_string()))?;
                let bytes = field.bytes().await.map_err(|e| ApiError::Validation(e.body_text()))?;
                file = Some((content_type, bytes));
            }
            Some("folder") => {
                folder = Some(field.text().await.map_err(|e| ApiError::Validation(e.body_text()))?);
            }
            _ => {}
        }
    }

    let (content_type, bytes) = file.ok_or_else(|| ApiError::Validation("missing 'file' part".to_string()))?;
    let stored = services.upload_image(folder.as_deref(), &content_type, bytes).await?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            key: stored.key,
            url: stored.url,
        }),
    ))
}

pub async fn delete_upload(
    Extension(services): Extension<Arc<AppServices>>,
    user: CurrentUser,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    authz::require(&user, &permissions::UPLOADS_WRITE)?;
    services.delete_upload(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
