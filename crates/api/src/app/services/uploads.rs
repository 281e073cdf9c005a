use bytes::Bytes;
use tracing::{info, instrument};

use storefront_infra::storage::image_extension;
use storefront_infra::ObjectStorage;

use super::AppServices;
use crate::app::errors::{ApiError, ApiResult};

pub const DEFAULT_FOLDER: &str = "products";

/// A stored object and where clients can fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

impl AppServices {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_image(&self, folder: Option<&str>, content_type: &str, bytes: Bytes) -> ApiResult<StoredObject> {
        let extension = image_extension(content_type)
            .ok_or_else(|| ApiError::Validation(format!("unsupported content type '{content_type}'")))?;
        if bytes.is_empty() {
            return Err(ApiError::Validation("file is empty".to_string()));
        }
        if bytes.len() > self.settings.upload_max_bytes {
            return Err(ApiError::Validation(format!(
                "file exceeds {} bytes",
                self.settings.upload_max_bytes
            )));
        }

        let folder = sanitize_folder(folder.unwrap_or(DEFAULT_FOLDER))?;
        let key = ObjectStorage::new_image_key(&folder, extension);
        let url = self.storage.put(&key, bytes, content_type).await?;
        info!(%key, "image uploaded");
        Ok(StoredObject { key, url })
    }

    pub async fn delete_upload(&self, key: &str) -> ApiResult<()> {
        self.storage.delete(key).await?;
        info!(%key, "upload deleted");
        Ok(())
    }
}

/// Folders are a single lower-case path segment.
fn sanitize_folder(raw: &str) -> ApiResult<String> {
    let folder = raw.trim().trim_matches('/').to_ascii_lowercase();
    let valid = !folder.is_empty()
        && folder.len() <= 32
        && folder.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ApiError::Validation(format!("invalid folder '{raw}'")));
    }
    Ok(folder)
}
