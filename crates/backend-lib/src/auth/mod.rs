// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod lifecycle;
pub mod password;
pub mod session;
pub mod token;

use crate::store::{IdentityField, StoreError};
use crate::validation::ValidationError;
use thiserror::Error;

pub use lifecycle::AccountService;
pub use password::{hash_password, hash_password_secure, verify_password};
pub use session::{CurrentPrincipal, SessionResolver};
pub use token::{InvalidToken, TokenCodec, TOKEN_TTL_SECS};

/// Domain errors of the identity subsystem
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Could not validate credentials")]
    Unauthorized,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Account is not temporary or does not exist")]
    AccountNotEligible,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateIdentity(IdentityField::Username) => AuthError::UsernameTaken,
            StoreError::DuplicateIdentity(IdentityField::Email) => AuthError::EmailTaken,
            StoreError::NotTemporary => AuthError::AccountNotEligible,
            StoreError::Backend(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<InvalidToken> for AuthError {
    fn from(_: InvalidToken) -> Self {
        AuthError::Unauthorized
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("password worker failed: {err}"))
    }
}
