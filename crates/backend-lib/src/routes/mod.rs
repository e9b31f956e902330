// ============================
// crates/backend-lib/src/routes/mod.rs
// ============================
//! HTTP router.
pub mod account;
pub mod photo;

use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Largest accepted photo
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Room for multipart boundaries and part headers on top of the photo
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/temp-account", post(account::create_temp_account))
        .route("/register", post(account::register))
        .route("/login", post(account::login))
        .route("/convert-account", post(account::convert_account))
        .route("/me", get(account::me))
        .route(
            "/photo",
            post(photo::upload_photo)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/photo/{filename}", get(photo::serve_photo))
        .route("/photo/{filename}/url", get(photo::photo_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
