// ============================
// crates/backend-lib/src/media/gateway.rs
// ============================
//! Photo operations on top of an `ObjectStore`.
use super::url::rewrite_presigned_url;
use super::{content_type_for, normalize_extension, MediaError, ObjectStore, DEFAULT_EXTENSION};
use crate::metrics::{MEDIA_DELETE_FAILED, MEDIA_UPLOADED};
use crate::validation::validate_object_name;
use bytes::Bytes;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifetime of client-facing photo links
pub const PRESIGNED_URL_TTL_SECS: u64 = 3600;

#[derive(Clone)]
pub struct MediaGateway {
    store: Arc<dyn ObjectStore>,
    external_endpoint: Option<String>,
}

impl MediaGateway {
    pub fn new(store: Arc<dyn ObjectStore>, external_endpoint: Option<String>) -> Self {
        Self {
            store,
            external_endpoint,
        }
    }

    pub async fn ensure_bucket(&self) -> Result<(), MediaError> {
        self.store.ensure_bucket().await
    }

    /// Store `body` under a fresh `<uuid><ext>` name and return the name
    pub async fn upload(&self, body: Bytes, extension: &str) -> Result<String, MediaError> {
        self.ensure_bucket().await?;

        let extension =
            normalize_extension(extension).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        let filename = format!("{}{extension}", Uuid::new_v4());
        let size = body.len();

        self.store
            .put(&filename, body, content_type_for(&extension))
            .await?;

        counter!(MEDIA_UPLOADED).increment(1);
        info!(%filename, size, "photo uploaded");
        Ok(filename)
    }

    /// Store `body` under a caller-chosen name, replacing any existing object
    pub async fn upload_named(&self, filename: &str, body: Bytes) -> Result<(), MediaError> {
        validate_object_name(filename).map_err(|_| MediaError::InvalidName)?;
        self.store
            .put(filename, body, content_type_for(filename))
            .await
    }

    /// Best-effort removal; failures are logged and swallowed
    pub async fn delete(&self, filename: &str) {
        if validate_object_name(filename).is_err() {
            debug!(%filename, "skipping delete of invalid object name");
            return;
        }
        if let Err(e) = self.store.delete(filename).await {
            counter!(MEDIA_DELETE_FAILED).increment(1);
            warn!(%filename, error = %e, "photo delete failed");
        }
    }

    /// Client-facing time-limited link to an existing object
    pub async fn presigned_url(&self, filename: &str, ttl_secs: u64) -> Result<String, MediaError> {
        validate_object_name(filename).map_err(|_| MediaError::ObjectNotFound)?;
        if !self.store.exists(filename).await? {
            return Err(MediaError::ObjectNotFound);
        }
        let generated = self
            .store
            .presign_get(filename, Duration::from_secs(ttl_secs))
            .await?;
        Ok(rewrite_presigned_url(
            &generated,
            self.external_endpoint.as_deref(),
        ))
    }

    /// Object bytes together with the content type they are served as
    pub async fn fetch_object(&self, filename: &str) -> Result<(Bytes, &'static str), MediaError> {
        validate_object_name(filename).map_err(|_| MediaError::ObjectNotFound)?;
        let body = self.store.get(filename).await?;
        Ok((body, content_type_for(filename)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MemoryObjectStore;
    use async_trait::async_trait;

    fn gateway(store: &MemoryObjectStore, external: Option<&str>) -> MediaGateway {
        MediaGateway::new(Arc::new(store.clone()), external.map(str::to_string))
    }

    #[tokio::test]
    async fn test_upload_generates_unique_names() {
        let store = MemoryObjectStore::new();
        let media = gateway(&store, None);

        let a = media.upload(Bytes::from_static(b"one"), ".PNG").await.unwrap();
        let b = media.upload(Bytes::from_static(b"two"), ".png").await.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), 36 + 4);
        assert!(Uuid::parse_str(&a[..36]).is_ok());
        assert!(store.bucket_ready());
        assert_eq!(store.content_type(&a).as_deref(), Some("image/png"));

        let c = media.upload(Bytes::from_static(b"three"), "").await.unwrap();
        assert!(c.ends_with(".jpg"));
        assert_eq!(store.content_type(&c).as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn test_fetch_and_delete() {
        let store = MemoryObjectStore::new();
        let media = gateway(&store, None);
        let name = media.upload(Bytes::from_static(b"gif-bytes"), ".gif").await.unwrap();

        let (body, content_type) = media.fetch_object(&name).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"gif-bytes"));
        assert_eq!(content_type, "image/gif");

        media.delete(&name).await;
        assert!(matches!(media.fetch_object(&name).await, Err(MediaError::ObjectNotFound)));
        // deleting again is silent
        media.delete(&name).await;
        media.delete("../etc/passwd").await;
    }

    #[tokio::test]
    async fn test_invalid_names_behave_as_missing() {
        let media = gateway(&MemoryObjectStore::new(), None);
        assert!(matches!(media.fetch_object("../x.jpg").await, Err(MediaError::ObjectNotFound)));
        assert!(matches!(
            media.presigned_url("a/b.jpg", 60).await,
            Err(MediaError::ObjectNotFound)
        ));
        assert!(matches!(
            media.upload_named(".hidden.jpg", Bytes::new()).await,
            Err(MediaError::InvalidName)
        ));
    }

    #[tokio::test]
    async fn test_presigned_url_rewrites_authority() {
        let store = MemoryObjectStore::with_base_url("http://minio:9000/photos");
        let name = gateway(&store, None)
            .upload(Bytes::from_static(b"x"), ".jpg")
            .await
            .unwrap();

        let url = gateway(&store, None)
            .presigned_url(&name, PRESIGNED_URL_TTL_SECS)
            .await
            .unwrap();
        assert_eq!(
            url,
            format!("http://localhost:9000/photos/{name}?X-Amz-Expires=3600&X-Amz-Signature=memory")
        );

        let url = gateway(&store, Some("https://media.example.com"))
            .presigned_url(&name, 60)
            .await
            .unwrap();
        assert!(url.starts_with(&format!("https://media.example.com/photos/{name}?")));

        assert!(matches!(
            gateway(&store, None).presigned_url("missing.jpg", 60).await,
            Err(MediaError::ObjectNotFound)
        ));
    }

    #[tokio::test]
    async fn test_upload_named_keeps_name_and_type() {
        let store = MemoryObjectStore::new();
        let media = gateway(&store, None);
        media
            .upload_named("legacy-photo.webp", Bytes::from_static(b"w"))
            .await
            .unwrap();
        assert_eq!(store.content_type("legacy-photo.webp").as_deref(), Some("image/webp"));
    }

    struct FailingStore;

    #[async_trait]
    impl ObjectStore for FailingStore {
        async fn ensure_bucket(&self) -> Result<(), MediaError> {
            Err(MediaError::Backend("unreachable".to_string()))
        }
        async fn put(&self, _: &str, _: Bytes, _: &str) -> Result<(), MediaError> {
            Err(MediaError::Backend("unreachable".to_string()))
        }
        async fn get(&self, _: &str) -> Result<Bytes, MediaError> {
            Err(MediaError::Backend("unreachable".to_string()))
        }
        async fn exists(&self, _: &str) -> Result<bool, MediaError> {
            Err(MediaError::Backend("unreachable".to_string()))
        }
        async fn delete(&self, _: &str) -> Result<(), MediaError> {
            Err(MediaError::Backend("unreachable".to_string()))
        }
        async fn presign_get(&self, _: &str, _: Duration) -> Result<String, MediaError> {
            Err(MediaError::Backend("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_backend_failures() {
        let media = MediaGateway::new(Arc::new(FailingStore), None);
        assert!(matches!(
            media.upload(Bytes::from_static(b"x"), ".jpg").await,
            Err(MediaError::Backend(_))
        ));
        // swallowed
        media.delete("a.jpg").await;
    }
}
