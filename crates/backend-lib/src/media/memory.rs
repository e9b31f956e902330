// ============================
// crates/backend-lib/src/media/memory.rs
// ============================
//! In-process object store for tests and local runs without MinIO.
use super::{MediaError, ObjectStore};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
}

/// DashMap-backed bucket
#[derive(Clone)]
pub struct MemoryObjectStore {
    objects: Arc<DashMap<String, StoredObject>>,
    bucket_ready: Arc<AtomicBool>,
    base_url: Arc<str>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:9000/photos")
    }

    /// `base_url` prefixes the fake presigned links
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            objects: Arc::new(DashMap::new()),
            bucket_ready: Arc::new(AtomicBool::new(false)),
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    pub fn bucket_ready(&self) -> bool {
        self.bucket_ready.load(Ordering::SeqCst)
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.get(key).map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_bucket(&self) -> Result<(), MediaError> {
        self.bucket_ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), MediaError> {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, MediaError> {
        self.objects
            .get(key)
            .map(|o| o.body.clone())
            .ok_or(MediaError::ObjectNotFound)
    }

    async fn exists(&self, key: &str) -> Result<bool, MediaError> {
        Ok(self.objects.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), MediaError> {
        self.objects.remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, MediaError> {
        Ok(format!(
            "{}/{}?X-Amz-Expires={}&X-Amz-Signature=memory",
            self.base_url,
            key,
            ttl.as_secs()
        ))
    }
}
