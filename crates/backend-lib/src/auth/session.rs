// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session resolution: bearer token in, validated principal out.
use super::{AuthError, TokenCodec};
use crate::error::AppError;
use crate::store::CredentialStore;
use crate::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::{DateTime, Utc};
use easymeal_common::PrincipalSummary;
use std::sync::Arc;
use tracing::debug;

/// Gate evaluated on every protected call.
///
/// Side-effect free; performs exactly one store lookup per resolved token.
#[derive(Clone)]
pub struct SessionResolver {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn CredentialStore>, codec: Arc<TokenCodec>) -> Self {
        Self { store, codec }
    }

    /// Resolve a raw bearer token into the principal it names
    pub async fn resolve(
        &self,
        raw_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PrincipalSummary, AuthError> {
        let token = raw_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthorized)?;

        let id = self.codec.verify(token, now)?;

        match self.store.find_by_id(id).await? {
            Some(principal) => Ok(principal.summary()),
            None => {
                debug!(principal = %id, "token names a principal that no longer exists");
                Err(AuthError::Unauthorized)
            },
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim())
}

/// The authenticated caller of a protected handler
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub PrincipalSummary);

impl FromRequestParts<Arc<AppState>> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let summary = state
            .sessions
            .resolve(bearer_token(&parts.headers), Utc::now())
            .await?;
        Ok(CurrentPrincipal(summary))
    }
}
