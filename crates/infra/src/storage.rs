//! Object storage for uploaded product images.
//!
//! S3-compatible buckets in production, an in-process store otherwise.
//! Either way callers get back a public URL built from `public_url`.

use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::StorageConfig;

/// Image content types accepted for upload, with their file extension.
pub const IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StorageError::NotFound(path),
            other => StorageError::Backend(other.to_string()),
        }
    }
}

/// Extension for an accepted image content type.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    IMAGE_TYPES.iter().find(|(ct, _)| *ct == essence).map(|(_, ext)| *ext)
}

#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    public_url: String,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("store", &self.store.to_string())
            .field("public_url", &self.public_url)
            .finish()
    }
}

impl ObjectStorage {
    pub fn new(store: Arc<dyn ObjectStore>, public_url: impl Into<String>) -> Self {
        Self {
            store,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn in_memory(public_url: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemory::new()), public_url)
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let Some(s3) = &config.s3 else {
            info!("object storage: in-memory");
            return Ok(Self::in_memory(config.public_url.clone()));
        };

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&s3.bucket)
            .with_region(&s3.region);
        if let Some(endpoint) = &s3.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"))
                .with_virtual_hosted_style_request(false);
        }
        if let (Some(key), Some(secret)) = (&s3.access_key_id, &s3.secret_access_key) {
            builder = builder.with_access_key_id(key).with_secret_access_key(secret);
        }
        let store = builder.build()?;
        info!(bucket = %s3.bucket, region = %s3.region, "object storage: s3");
        Ok(Self::new(Arc::new(store), config.public_url.clone()))
    }

    /// Key for a fresh upload, e.g. `products/<uuid>.png`.
    pub fn new_image_key(prefix: &str, extension: &str) -> String {
        format!("{}/{}.{}", prefix.trim_matches('/'), Uuid::now_v7(), extension)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    /// Inverse of [`ObjectStorage::public_url`]; `None` for foreign URLs.
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    /// Store `bytes` under `key` and return the object's public URL.
    #[instrument(skip(self, bytes), fields(size = bytes.len()), err)]
    pub async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, StorageError> {
        let path = parse_key(key)?;
        let options = PutOptions {
            attributes: Attributes::from_iter([(Attribute::ContentType, content_type.to_string())]),
            ..Default::default()
        };
        self.store.put_opts(&path, PutPayload::from(bytes), options).await?;
        debug!(%key, "object stored");
        Ok(self.public_url(key))
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = parse_key(key)?;
        self.store.delete(&path).await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = parse_key(key)?;
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_key(key: &str) -> Result<ObjectPath, StorageError> {
    if key.is_empty() || key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    ObjectPath::parse(key).map_err(|e| StorageError::InvalidKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_images() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("IMAGE/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(image_extension("application/pdf"), None);
        assert_eq!(image_extension(""), None);
    }

    #[test]
    fn urls_round_trip_to_keys() {
        let storage = ObjectStorage::in_memory("http://cdn.local/media/");
        let url = storage.public_url("products/a.png");
        assert_eq!(url, "http://cdn.local/media/products/a.png");
        assert_eq!(storage.key_from_url(&url).as_deref(), Some("products/a.png"));
        assert_eq!(storage.key_from_url("https://elsewhere/x.png"), None);
    }

    #[test]
    fn image_keys_are_unique_and_prefixed() {
        let a = ObjectStorage::new_image_key("/products/", "png");
        let b = ObjectStorage::new_image_key("products", "png");
        assert!(a.starts_with("products/") && a.ends_with(".png"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn put_then_delete() {
        let storage = ObjectStorage::in_memory("memory://uploads");
        let url = storage
            .put("products/x.png", Bytes::from_static(b"\x89PNG"), "image/png")
            .await
            .unwrap();
        assert_eq!(url, "memory://uploads/products/x.png");
        assert!(storage.exists("products/x.png").await.unwrap());

        storage.delete("products/x.png").await.unwrap();
        assert!(!storage.exists("products/x.png").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_traversal_keys() {
        let storage = ObjectStorage::in_memory("memory://uploads");
        let err = storage.put("../etc/passwd", Bytes::new(), "image/png").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
