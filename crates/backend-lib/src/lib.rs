// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the `EasyMeal` identity and media server.

pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod metrics;
pub mod migrate;
pub mod routes;
pub mod store;
pub mod validation;

use crate::auth::{AccountService, SessionResolver, TokenCodec};
use crate::config::{DatabaseSettings, ObjectStoreSettings, Settings};
use crate::media::{MediaGateway, MemoryObjectStore, ObjectStore, S3ObjectStore};
use crate::store::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
use std::sync::Arc;
use tracing::warn;

pub use routes::create_router;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Account lifecycle operations
    pub accounts: AccountService,
    /// Bearer token gate for protected routes
    pub sessions: SessionResolver,
    /// Photo storage
    pub media: MediaGateway,
    /// Settings the state was built from
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the components over explicit backends
    pub fn new(
        settings: Settings,
        credentials: Arc<dyn CredentialStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(
            settings.auth.secret_key.expose().as_bytes(),
        ));
        let media = MediaGateway::new(objects, settings.object_store.external_endpoint.clone());

        Self {
            accounts: AccountService::new(credentials.clone(), codec.clone()),
            sessions: SessionResolver::new(credentials, codec),
            media,
            settings: Arc::new(settings),
        }
    }

    /// Pick backends from `settings`, falling back to in-memory ones
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let credentials = credential_store(&settings.database).await?;
        let objects = object_store(&settings.object_store).await;
        Ok(Self::new(settings, credentials, objects))
    }
}

/// PostgreSQL when a URL is configured, otherwise process memory
pub async fn credential_store(
    settings: &DatabaseSettings,
) -> anyhow::Result<Arc<dyn CredentialStore>> {
    match &settings.url {
        Some(url) => {
            let store = PgCredentialStore::connect(url.expose(), settings.max_connections).await?;
            Ok(Arc::new(store))
        },
        None => {
            warn!("database.url not set, accounts are kept in memory and lost on restart");
            Ok(Arc::new(MemoryCredentialStore::new()))
        },
    }
}

/// S3/MinIO when an endpoint is configured, otherwise process memory
pub async fn object_store(settings: &ObjectStoreSettings) -> Arc<dyn ObjectStore> {
    match &settings.endpoint {
        Some(endpoint) => Arc::new(S3ObjectStore::connect(settings, endpoint).await),
        None => {
            warn!("object_store.endpoint not set, photos are kept in memory and lost on restart");
            Arc::new(MemoryObjectStore::new())
        },
    }
}
