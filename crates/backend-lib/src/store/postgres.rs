// ============================
// crates/backend-lib/src/store/postgres.rs
// ============================
//! PostgreSQL credential store.
//!
//! Uniqueness is enforced by the `users_username_key` / `users_email_key`
//! constraints and conversion is a compare-and-set on `is_temporary`, so
//! concurrent writers cannot both win.

use super::{CredentialStore, Identity, IdentityField, Principal, PrincipalId, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: Option<String>,
    email: Option<String>,
    password_hash: Option<String>,
    created_at: DateTime<Utc>,
    is_temporary: bool,
    is_premium: bool,
    premium_until: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for Principal {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let identity = match (row.is_temporary, row.username, row.email, row.password_hash) {
            (true, None, None, None) => Identity::Temporary,
            (false, Some(username), Some(email), Some(secret_hash)) => Identity::Permanent {
                username,
                email,
                secret_hash,
            },
            _ => {
                return Err(StoreError::Backend(format!(
                    "user {} violates the identity invariant",
                    row.id
                )))
            },
        };
        Ok(Principal {
            id: PrincipalId(row.id),
            identity,
            created_at: row.created_at,
            is_premium: row.is_premium,
            premium_until: row.premium_until,
        })
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Translate unique violations into `DuplicateIdentity`
fn write_error(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            match db.constraint() {
                Some(USERNAME_CONSTRAINT) => {
                    return StoreError::DuplicateIdentity(IdentityField::Username)
                },
                Some(EMAIL_CONSTRAINT) => return StoreError::DuplicateIdentity(IdentityField::Email),
                _ => {},
            }
        }
    }
    backend(e)
}

/// Credential store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Connect and bring the schema up to date
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(backend)?;
        let store = Self::from_pool(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        info!("database schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_one(&self, sql: &str, key: &str) -> Result<Option<Principal>, StoreError> {
        sqlx::query_as::<_, UserRow>(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(Principal::try_from)
            .transpose()
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at, is_temporary, is_premium, premium_until
             FROM users WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(Principal::try_from)
        .transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError> {
        self.find_one(
            "SELECT id, username, email, password_hash, created_at, is_temporary, is_premium, premium_until
             FROM users WHERE username = $1",
            username,
        )
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        self.find_one(
            "SELECT id, username, email, password_hash, created_at, is_temporary, is_premium, premium_until
             FROM users WHERE email = $1",
            email,
        )
        .await
    }

    async fn insert_temporary(&self) -> Result<Principal, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (is_temporary, is_premium, created_at)
             VALUES (TRUE, FALSE, $1)
             RETURNING id, username, email, password_hash, created_at, is_temporary, is_premium, premium_until",
        )
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Principal::try_from(row)
    }

    async fn insert_permanent(
        &self,
        username: &str,
        email: &str,
        secret_hash: &str,
    ) -> Result<Principal, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, email, password_hash, is_temporary, is_premium, created_at)
             VALUES ($1, $2, $3, FALSE, FALSE, $4)
             RETURNING id, username, email, password_hash, created_at, is_temporary, is_premium, premium_until",
        )
        .bind(username)
        .bind(email)
        .bind(secret_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Principal::try_from(row)
    }

    async fn convert_to_permanent(
        &self,
        id: PrincipalId,
        username: &str,
        email: &str,
        secret_hash: &str,
    ) -> Result<Principal, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users
             SET username = $2, email = $3, password_hash = $4, is_temporary = FALSE
             WHERE id = $1 AND is_temporary
             RETURNING id, username, email, password_hash, created_at, is_temporary, is_premium, premium_until",
        )
        .bind(id.0)
        .bind(username)
        .bind(email)
        .bind(secret_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error)?;

        match row {
            Some(row) => Principal::try_from(row),
            None => Err(StoreError::NotTemporary),
        }
    }
}
