// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use crate::auth::AuthError;
use crate::media::MediaError;
use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use easymeal_common::{ErrorDetail, ErrorResponse};
use thiserror::Error;
use tracing::{error, warn};

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Could not validate credentials")]
    Unauthorized,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Account is not temporary or does not exist")]
    AccountNotEligible,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File must be an image")]
    UnsupportedMediaType,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::UsernameTaken
            | AppError::EmailTaken
            | AppError::AccountNotEligible
            | AppError::InvalidInput(_)
            | AppError::UnsupportedMediaType => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "AUTH_001",
            AppError::InvalidCredentials => "AUTH_002",
            AppError::UsernameTaken => "ACCT_001",
            AppError::EmailTaken => "ACCT_002",
            AppError::AccountNotEligible => "ACCT_003",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::NotFound(_) => "NF_001",
            AppError::UnsupportedMediaType => "MEDIA_001",
            AppError::PayloadTooLarge => "SIZE_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Message safe to show clients; internal details are never included
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            AppError::NotFound(_) => "Resource not found".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Internal(detail) => error!(code = self.error_code(), %detail, "request failed"),
            AppError::NotFound(what) => warn!(code = self.error_code(), %what, "not found"),
            _ => {},
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.sanitized_message(),
            },
        };

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized => AppError::Unauthorized,
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::UsernameTaken => AppError::UsernameTaken,
            AuthError::EmailTaken => AppError::EmailTaken,
            AuthError::AccountNotEligible => AppError::AccountNotEligible,
            AuthError::InvalidInput(e) => AppError::InvalidInput(e.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::ObjectNotFound | MediaError::InvalidName => {
                AppError::NotFound("photo".to_string())
            },
            MediaError::Backend(msg) => AppError::Internal(msg),
        }
    }
}
