// ============================
// crates/backend-lib/src/migrate/mod.rs
// ============================
//! One-shot migration from the legacy deployment.
//!
//! Record pass: SQLite `users` then `meals` into PostgreSQL in a single
//! transaction. File pass: photos from a flat directory into the bucket.
//! Sequential; run it with the server stopped.

pub mod photos;
pub mod records;

use crate::media::{MediaError, MediaGateway};
use crate::store::{PgCredentialStore, StoreError};
use sqlx::PgPool;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

pub use photos::{migrate_photos, LegacyPhotoDir};
pub use records::{migrate_records, open_legacy, parse_legacy_timestamp};

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("legacy database error: {0}")]
    Legacy(#[source] sqlx::Error),

    #[error("target database error: {0}")]
    Target(#[source] sqlx::Error),

    #[error("schema setup failed: {0}")]
    Schema(#[from] StoreError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file name is not valid UTF-8: {}", .0.display())]
    InvalidFileName(PathBuf),
}

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub legacy_db_path: PathBuf,
    pub photos_dir: PathBuf,
    pub skip_records: bool,
    pub skip_files: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableReport {
    pub inserted: u64,
    pub skipped: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhotoReport {
    pub migrated: u64,
    pub failed: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub legacy_db_found: bool,
    pub users: TableReport,
    pub meals: TableReport,
    /// `None` when the file pass did not run
    pub photos: Option<PhotoReport>,
}

/// Run the whole migration against `target` and `media`
pub async fn run(
    target: &PgPool,
    media: &MediaGateway,
    options: &MigrationOptions,
) -> Result<MigrationReport, MigrationError> {
    PgCredentialStore::from_pool(target.clone())
        .run_migrations()
        .await?;

    let mut report = MigrationReport::default();

    if !options.legacy_db_path.is_file() {
        info!(
            path = %options.legacy_db_path.display(),
            "legacy database not found, initialising empty schema and bucket only"
        );
        media.ensure_bucket().await?;
        return Ok(report);
    }
    report.legacy_db_found = true;

    if options.skip_records {
        info!("record pass skipped");
    } else {
        let legacy = open_legacy(&options.legacy_db_path).await?;
        let outcome = migrate_records(&legacy, target).await;
        legacy.close().await;
        (report.users, report.meals) = outcome?;
    }

    if options.skip_files {
        info!("file pass skipped");
    } else if let Some(dir) = LegacyPhotoDir::open(&options.photos_dir) {
        report.photos = Some(migrate_photos(&dir, media).await?);
    } else {
        info!(
            path = %options.photos_dir.display(),
            "photos directory not found, file pass skipped"
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MemoryObjectStore;
    use std::path::Path;
    use std::sync::Arc;

    async fn target() -> Option<PgPool> {
        let url = std::env::var("EASYMEAL_TEST_DATABASE_URL").ok()?;
        Some(PgPool::connect(&url).await.unwrap())
    }

    fn options(root: &Path, skip_records: bool, skip_files: bool) -> MigrationOptions {
        MigrationOptions {
            legacy_db_path: root.join("meals.db"),
            photos_dir: root.join("photos"),
            skip_records,
            skip_files,
        }
    }

    #[tokio::test]
    async fn test_missing_legacy_db_prepares_schema_and_bucket() {
        let Some(target) = target().await else {
            return;
        };
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("photos")).unwrap();
        std::fs::write(root.path().join("photos/a.jpg"), b"jpg").unwrap();

        let objects = MemoryObjectStore::new();
        let media = MediaGateway::new(Arc::new(objects.clone()), None);

        let report = run(&target, &media, &options(root.path(), false, false))
            .await
            .unwrap();
        assert_eq!(report, MigrationReport::default());
        assert!(objects.bucket_ready());
        // photos are not copied without a legacy database
        assert!(objects.is_empty());

        // schema is in place
        let _: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&target)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_skip_flags() {
        let Some(target) = target().await else {
            return;
        };
        let root = tempfile::tempdir().unwrap();
        // skipping records never opens the legacy file
        std::fs::write(root.path().join("meals.db"), b"").unwrap();
        std::fs::create_dir(root.path().join("photos")).unwrap();
        std::fs::write(root.path().join("photos/a.jpg"), b"jpg").unwrap();
        std::fs::write(root.path().join("photos/notes.txt"), b"txt").unwrap();

        let objects = MemoryObjectStore::new();
        let media = MediaGateway::new(Arc::new(objects.clone()), None);

        let report = run(&target, &media, &options(root.path(), true, true))
            .await
            .unwrap();
        assert!(report.legacy_db_found);
        assert_eq!(report.users, TableReport::default());
        assert_eq!(report.meals, TableReport::default());
        assert_eq!(report.photos, None);
        assert!(objects.is_empty());

        let report = run(&target, &media, &options(root.path(), true, false))
            .await
            .unwrap();
        assert_eq!(report.users, TableReport::default());
        assert_eq!(report.photos, Some(PhotoReport { migrated: 1, failed: 0 }));
        assert_eq!(objects.len(), 1);

        // a missing photos directory only skips the file pass
        std::fs::remove_dir_all(root.path().join("photos")).unwrap();
        let report = run(&target, &media, &options(root.path(), true, false))
            .await
            .unwrap();
        assert!(report.legacy_db_found);
        assert_eq!(report.photos, None);
    }
}
