// ============================
// crates/backend-lib/src/auth/lifecycle.rs
// ============================
//! Account lifecycle: temporary creation, conversion, registration and login.
use super::{hash_password, hash_password_secure, verify_password, AuthError, TokenCodec};
use crate::metrics::{
    ACCOUNT_CONVERTED, ACCOUNT_REGISTERED, ACCOUNT_TEMP_CREATED, LOGIN_FAILED, LOGIN_SUCCEEDED,
};
use crate::store::{CredentialStore, PrincipalId};
use crate::validation::validate_credentials;
use chrono::{DateTime, Utc};
use easymeal_common::PrincipalSummary;
use metrics::counter;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument};

/// Hash verified against when a login has no stored hash, so every refused
/// login pays the same scrypt cost.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("easymeal-unused-password").unwrap_or_default());

/// Why a login attempt was refused. Only ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginRejection {
    UnknownUser,
    TemporaryAccount,
    WrongPassword,
}

impl fmt::Display for LoginRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginRejection::UnknownUser => write!(f, "unknown user"),
            LoginRejection::TemporaryAccount => write!(f, "temporary account"),
            LoginRejection::WrongPassword => write!(f, "wrong password"),
        }
    }
}

/// Orchestrates principal state transitions over the credential store
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
}

impl AccountService {
    pub fn new(store: Arc<dyn CredentialStore>, codec: Arc<TokenCodec>) -> Self {
        Self { store, codec }
    }

    fn issue(&self, id: PrincipalId, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.codec
            .issue(id, now)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    /// Create an anonymous principal and a token for it
    #[instrument(skip(self))]
    pub async fn create_temporary(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(PrincipalSummary, String), AuthError> {
        let principal = self.store.insert_temporary().await?;
        let token = self.issue(principal.id, now)?;
        counter!(ACCOUNT_TEMP_CREATED).increment(1);
        info!(principal = %principal.id, "temporary account created");
        Ok((principal.summary(), token))
    }

    /// Upgrade the calling temporary principal to a permanent one.
    ///
    /// Tokens issued before the conversion stay valid since they name the
    /// same id.
    #[instrument(skip(self, password))]
    pub async fn convert(
        &self,
        current: PrincipalId,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<PrincipalSummary, AuthError> {
        match self.store.find_by_id(current).await? {
            Some(p) if p.is_temporary() => {},
            _ => return Err(AuthError::AccountNotEligible),
        }
        validate_credentials(username, email, password)?;

        if let Some(holder) = self.store.find_by_username(username).await? {
            if holder.id != current {
                return Err(AuthError::UsernameTaken);
            }
        }
        if let Some(holder) = self.store.find_by_email(email).await? {
            if holder.id != current {
                return Err(AuthError::EmailTaken);
            }
        }

        let secret_hash = self.hash(password).await?;
        let principal = self
            .store
            .convert_to_permanent(current, username, email, &secret_hash)
            .await?;

        counter!(ACCOUNT_CONVERTED).increment(1);
        info!(principal = %principal.id, "temporary account converted");
        Ok(principal.summary())
    }

    /// Create a credentialed principal directly
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<PrincipalSummary, AuthError> {
        validate_credentials(username, email, password)?;

        if self.store.find_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        if self.store.find_by_email(email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let secret_hash = self.hash(password).await?;
        // the store constraint decides races the pre-check cannot see
        let principal = self
            .store
            .insert_permanent(username, email, &secret_hash)
            .await?;

        counter!(ACCOUNT_REGISTERED).increment(1);
        info!(principal = %principal.id, "account registered");
        Ok(principal.summary())
    }

    /// Authenticate by username and password, returning a fresh token
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        match self.check_password(username, password).await? {
            Ok(id) => {
                counter!(LOGIN_SUCCEEDED).increment(1);
                self.issue(id, now)
            },
            Err(reason) => {
                counter!(LOGIN_FAILED).increment(1);
                debug!(%reason, "login refused");
                Err(AuthError::InvalidCredentials)
            },
        }
    }

    async fn check_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Result<PrincipalId, LoginRejection>, AuthError> {
        let principal = self.store.find_by_username(username).await?;
        let stored = principal
            .as_ref()
            .and_then(|p| p.secret_hash())
            .map(str::to_string);

        let plain = password.to_string();
        let has_hash = stored.is_some();
        let matches = tokio::task::spawn_blocking(move || {
            let hash = stored.as_deref().unwrap_or_else(|| DUMMY_HASH.as_str());
            verify_password(hash, &plain)
        })
        .await?;

        Ok(match principal {
            None => Err(LoginRejection::UnknownUser),
            Some(_) if !has_hash => Err(LoginRejection::TemporaryAccount),
            Some(p) if matches => Ok(p.id),
            Some(_) => Err(LoginRejection::WrongPassword),
        })
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let mut plain = password.to_string();
        tokio::task::spawn_blocking(move || hash_password_secure(&mut plain))
            .await?
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }
}
