// ============================
// crates/backend-lib/src/migrate/photos.rs
// ============================
//! Legacy filesystem photos into the object store.
use super::{MigrationError, PhotoReport};
use crate::media::{is_photo_name, MediaGateway};
use crate::metrics::{MIGRATE_PHOTOS, MIGRATE_PHOTOS_FAILED};
use bytes::Bytes;
use metrics::counter;
use std::path::{Path, PathBuf};
use tokio::fs as tokio_fs;
use tracing::{info, warn};

/// Flat directory of legacy photo files
#[derive(Debug, Clone)]
pub struct LegacyPhotoDir {
    root: PathBuf,
}

impl LegacyPhotoDir {
    /// `None` when `root` is not an existing directory
    pub fn open<P: AsRef<Path>>(root: P) -> Option<Self> {
        let root = root.as_ref();
        root.is_dir().then(|| Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Regular files with a photo extension, sorted by name
    pub async fn list(&self) -> Result<Vec<PathBuf>, MigrationError> {
        let mut entries = tokio_fs::read_dir(&self.root).await?;
        let mut photos = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let is_photo = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_photo_name);
            if is_photo {
                photos.push(path);
            }
        }

        photos.sort();
        Ok(photos)
    }
}

async fn migrate_one(path: &Path, media: &MediaGateway) -> Result<String, MigrationError> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MigrationError::InvalidFileName(path.to_path_buf()))?
        .to_string();
    let body = tokio_fs::read(path).await?;
    media.upload_named(&filename, Bytes::from(body)).await?;
    Ok(filename)
}

/// Upload every photo under its own name.
///
/// Per-file failures are logged and counted; nothing is rolled back.
pub async fn migrate_photos(
    dir: &LegacyPhotoDir,
    media: &MediaGateway,
) -> Result<PhotoReport, MigrationError> {
    media.ensure_bucket().await?;

    let mut report = PhotoReport::default();
    for path in dir.list().await? {
        match migrate_one(&path, media).await {
            Ok(filename) => {
                info!(%filename, "migrated photo");
                report.migrated += 1;
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "photo migration failed");
                report.failed += 1;
            },
        }
    }

    counter!(MIGRATE_PHOTOS).increment(report.migrated);
    counter!(MIGRATE_PHOTOS_FAILED).increment(report.failed);
    info!(
        migrated = report.migrated,
        failed = report.failed,
        dir = %dir.root().display(),
        "photos migrated"
    );
    Ok(report)
}
