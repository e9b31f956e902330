// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the `EasyMeal` client and server.
//! This module defines the JSON bodies of the account and photo endpoints.

use serde::{Deserialize, Serialize};

/// Token type reported alongside every issued access token
pub const TOKEN_TYPE_BEARER: &str = "bearer";

/// Body of `POST /register` and `POST /convert-account`
/// # Fields
/// * `username` - Desired unique username
/// * `email` - Desired unique email address
/// * `password` - Plaintext password, hashed server-side and never stored
#[derive(Deserialize, Serialize, Clone)]
pub struct CredentialsRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /login`
#[derive(Deserialize, Serialize, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Access token returned by `POST /login` and `POST /temp-account`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    /// Signed bearer token
    pub access_token: String,
    /// Always `bearer`
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
        }
    }
}

/// Read-only projection of a principal, as exposed to clients.
///
/// The password hash never appears here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PrincipalSummary {
    pub id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_temporary: bool,
    pub is_premium: bool,
}

/// Response of `POST /photo`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    /// Generated object name, to be stored in a meal's `photo_filename`
    pub filename: String,
}

/// Error envelope returned by every failing endpoint
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Stable machine-readable code plus a human-readable message
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
