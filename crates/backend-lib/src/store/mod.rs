// ============================
// crates/backend-lib/src/store/mod.rs
// ============================
//! Credential store: persistence of principals and their uniqueness rules.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use easymeal_common::PrincipalSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Stable integer identifier of a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub i64);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity fields of a principal.
///
/// A temporary principal has no username, email or secret hash; a permanent
/// one has all three.
#[derive(Clone, PartialEq, Eq)]
pub enum Identity {
    Temporary,
    Permanent {
        username: String,
        email: String,
        secret_hash: String,
    },
}

/// A user record
#[derive(Clone)]
pub struct Principal {
    pub id: PrincipalId,
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
}

impl Principal {
    pub fn is_temporary(&self) -> bool {
        matches!(self.identity, Identity::Temporary)
    }

    pub fn username(&self) -> Option<&str> {
        match &self.identity {
            Identity::Permanent { username, .. } => Some(username),
            Identity::Temporary => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match &self.identity {
            Identity::Permanent { email, .. } => Some(email),
            Identity::Temporary => None,
        }
    }

    pub fn secret_hash(&self) -> Option<&str> {
        match &self.identity {
            Identity::Permanent { secret_hash, .. } => Some(secret_hash),
            Identity::Temporary => None,
        }
    }

    /// Outward projection without the secret hash
    pub fn summary(&self) -> PrincipalSummary {
        PrincipalSummary {
            id: self.id.0,
            username: self.username().map(str::to_string),
            email: self.email().map(str::to_string),
            is_temporary: self.is_temporary(),
            is_premium: self.is_premium,
        }
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("username", &self.username())
            .field("email", &self.email())
            .field("is_temporary", &self.is_temporary())
            .field("created_at", &self.created_at)
            .field("is_premium", &self.is_premium)
            .finish_non_exhaustive()
    }
}

/// Which unique identity column collided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Username,
    Email,
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityField::Username => write!(f, "username"),
            IdentityField::Email => write!(f, "email"),
        }
    }
}

/// Errors surfaced by credential store backends
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} already taken")]
    DuplicateIdentity(IdentityField),

    #[error("principal is missing or not a temporary account")]
    NotTemporary,

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence contract consumed by the session resolver and the account
/// lifecycle manager.
///
/// Uniqueness checks and the write they guard are atomic inside each
/// implementation; a losing concurrent writer gets `DuplicateIdentity`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError>;

    /// Create a principal with no identity fields
    async fn insert_temporary(&self) -> Result<Principal, StoreError>;

    /// Create a credentialed principal
    async fn insert_permanent(
        &self,
        username: &str,
        email: &str,
        secret_hash: &str,
    ) -> Result<Principal, StoreError>;

    /// Give a temporary principal its identity fields, exactly once
    async fn convert_to_permanent(
        &self,
        id: PrincipalId,
        username: &str,
        email: &str,
        secret_hash: &str,
    ) -> Result<Principal, StoreError>;
}
