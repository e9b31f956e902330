// ============================
// crates/backend-bin/src/main.rs
// ============================
//! Tokio / Axum entry-point for the EasyMeal server.

mod telemetry;

use anyhow::Context;
use clap::Parser;
use easymeal_backend_lib::{config::Settings, create_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "easymeal-server", about = "EasyMeal identity and photo server")]
struct Cli {
    /// Configuration file (defaults to ./easymeal.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    settings.validate().context("invalid configuration")?;
    telemetry::init_tracing(&settings.log_level);

    let bind_addr = settings.server.bind_addr;
    let state = Arc::new(AppState::from_settings(settings).await?);

    // an unreachable object store must not keep the server down
    if let Err(e) = state.media.ensure_bucket().await {
        warn!(error = %e, "could not ensure photo bucket at startup");
    }

    let app = create_router(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
