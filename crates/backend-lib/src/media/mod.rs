// ============================
// crates/backend-lib/src/media/mod.rs
// ============================
//! Object storage for user photos.
//!
//! `ObjectStore` is the backend primitive (S3/MinIO or in-memory);
//! `MediaGateway` is what handlers and the migration tool talk to.

pub mod gateway;
pub mod memory;
pub mod s3;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

pub use gateway::MediaGateway;
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

/// Fallback content type and upload extension
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Extensions recognised as photos
pub const PHOTO_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("object not found")]
    ObjectNotFound,

    #[error("invalid object name")]
    InvalidName,

    #[error("object store error: {0}")]
    Backend(String),
}

/// Primitive operations on a single bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the bucket if absent. Idempotent.
    async fn ensure_bucket(&self) -> Result<(), MediaError>;

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), MediaError>;

    async fn get(&self, key: &str) -> Result<Bytes, MediaError>;

    async fn exists(&self, key: &str) -> Result<bool, MediaError>;

    async fn delete(&self, key: &str) -> Result<(), MediaError>;

    /// Time-limited read URL as generated by the backend
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, MediaError>;
}

/// Content type for a filename or a bare extension (with or without dot)
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map_or(name, |(_, ext)| ext);
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Lowercased `.ext` form of an extension given with or without its dot.
///
/// `None` unless it is one of [`PHOTO_EXTENSIONS`], so a stored name always
/// agrees with the content type served for it.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.strip_prefix('.').unwrap_or(ext).to_ascii_lowercase();
    PHOTO_EXTENSIONS
        .contains(&ext.as_str())
        .then(|| format!(".{ext}"))
}

/// Extension to keep for an uploaded file name, `.jpg` unless it names a
/// known photo type
pub fn upload_extension(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| name.rsplit_once('.'))
        .and_then(|(_, ext)| normalize_extension(ext))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Whether a file name carries one of the photo extensions
pub fn is_photo_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| PHOTO_EXTENSIONS.contains(&ext.as_str()))
}
