// ============================
// crates/backend-bin/src/bin/migrate.rs
// ============================
//! Copy a legacy deployment (SQLite + photo directory) into PostgreSQL and
//! the object store. Run with the server stopped.

#[path = "../telemetry.rs"]
mod telemetry;

use anyhow::{bail, Context};
use clap::Parser;
use easymeal_backend_lib::{
    config::Settings,
    media::MediaGateway,
    migrate::{self, MigrationOptions},
    object_store,
    store::PgCredentialStore,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "easymeal-migrate", about = "Migrate legacy EasyMeal data")]
struct Cli {
    /// Configuration file (defaults to ./easymeal.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Legacy SQLite database, overrides `migration.legacy_db_path`
    #[arg(long)]
    legacy_db: Option<PathBuf>,

    /// Legacy photo directory, overrides `migration.photos_dir`
    #[arg(long)]
    photos_dir: Option<PathBuf>,

    /// Do not copy database rows
    #[arg(long)]
    skip_records: bool,

    /// Do not copy photo files
    #[arg(long)]
    skip_files: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    settings
        .validate_common()
        .context("invalid configuration")?;
    telemetry::init_tracing(&settings.log_level);

    let Some(url) = settings.database.url.as_ref() else {
        bail!("database.url must be set to migrate (EASYMEAL_DATABASE__URL)");
    };
    let target = PgCredentialStore::connect(url.expose(), settings.database.max_connections)
        .await
        .context("failed to connect to the target database")?;

    let media = MediaGateway::new(
        object_store(&settings.object_store).await,
        settings.object_store.external_endpoint.clone(),
    );

    let options = MigrationOptions {
        legacy_db_path: cli
            .legacy_db
            .unwrap_or_else(|| settings.migration.legacy_db_path.clone()),
        photos_dir: cli
            .photos_dir
            .unwrap_or_else(|| settings.migration.photos_dir.clone()),
        skip_records: cli.skip_records,
        skip_files: cli.skip_files,
    };
    info!(?options, "starting migration");

    let report = migrate::run(target.pool(), &media, &options).await?;

    info!(
        legacy_db_found = report.legacy_db_found,
        users = report.users.inserted,
        users_skipped = report.users.skipped,
        meals = report.meals.inserted,
        meals_skipped = report.meals.skipped,
        photos = report.photos.map_or(0, |p| p.migrated),
        photos_failed = report.photos.map_or(0, |p| p.failed),
        "migration complete"
    );
    Ok(())
}
