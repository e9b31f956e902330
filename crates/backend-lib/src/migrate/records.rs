// ============================
// crates/backend-lib/src/migrate/records.rs
// ============================
//! Legacy SQLite rows into PostgreSQL.
use super::{MigrationError, TableReport};
use crate::metrics::{MIGRATE_MEALS, MIGRATE_USERS};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use metrics::counter;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    PgConnection, PgPool, Row, SqlitePool,
};
use std::path::Path;
use tracing::{debug, info};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a legacy `created_at` value.
///
/// Accepts RFC 3339, naive ISO-8601 with `T` or space separator (taken as
/// UTC) and bare dates. Anything else, including a missing value, yields
/// `fallback`.
pub fn parse_legacy_timestamp(raw: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return fallback;
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.with_timezone(&Utc);
    }
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return ts.and_utc();
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return midnight.and_utc();
    }

    debug!(raw, "unparseable legacy timestamp, using fallback");
    fallback
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMeal {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub photo_filename: Option<String>,
    pub created_at: Option<String>,
    pub user_id: i64,
}

/// Open the legacy database without write access
pub async fn open_legacy(path: &Path) -> Result<SqlitePool, MigrationError> {
    let options = SqliteConnectOptions::new().filename(path).read_only(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(MigrationError::Legacy)
}

async fn has_column(legacy: &SqlitePool, table: &str, column: &str) -> Result<bool, MigrationError> {
    let found: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2")
            .bind(table)
            .bind(column)
            .fetch_one(legacy)
            .await
            .map_err(MigrationError::Legacy)?;
    Ok(found > 0)
}

pub async fn read_legacy_users(legacy: &SqlitePool) -> Result<Vec<LegacyUser>, MigrationError> {
    let rows = sqlx::query(
        "SELECT id, username, email, password_hash, CAST(created_at AS TEXT) AS created_at \
         FROM users ORDER BY id",
    )
    .fetch_all(legacy)
    .await
    .map_err(MigrationError::Legacy)?;

    rows.iter()
        .map(|row| {
            Ok(LegacyUser {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                email: row.try_get("email")?,
                password_hash: row.try_get("password_hash")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect::<Result<_, sqlx::Error>>()
        .map_err(MigrationError::Legacy)
}

/// Older legacy databases lack `url` and `photo_filename`; those read as NULL
pub async fn read_legacy_meals(legacy: &SqlitePool) -> Result<Vec<LegacyMeal>, MigrationError> {
    let url = if has_column(legacy, "meals", "url").await? {
        "url"
    } else {
        "NULL"
    };
    let photo = if has_column(legacy, "meals", "photo_filename").await? {
        "photo_filename"
    } else {
        "NULL"
    };

    let sql = format!(
        "SELECT id, name, description, {url} AS url, {photo} AS photo_filename, \
         CAST(created_at AS TEXT) AS created_at, user_id FROM meals ORDER BY id"
    );
    let rows = sqlx::query(&sql)
        .fetch_all(legacy)
        .await
        .map_err(MigrationError::Legacy)?;

    rows.iter()
        .map(|row| {
            Ok(LegacyMeal {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                url: row.try_get("url")?,
                photo_filename: row.try_get("photo_filename")?,
                created_at: row.try_get("created_at")?,
                user_id: row.try_get("user_id")?,
            })
        })
        .collect::<Result<_, sqlx::Error>>()
        .map_err(MigrationError::Legacy)
}

async fn insert_users(
    conn: &mut PgConnection,
    users: &[LegacyUser],
    now: DateTime<Utc>,
) -> Result<TableReport, MigrationError> {
    let mut report = TableReport::default();
    for user in users {
        let created_at = parse_legacy_timestamp(user.created_at.as_deref(), now);
        let result = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, is_temporary, is_premium) \
             VALUES ($1, $2, $3, $4, $5, FALSE, FALSE) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(created_at)
        .execute(&mut *conn)
        .await
        .map_err(MigrationError::Target)?;

        if result.rows_affected() == 0 {
            debug!(id = user.id, "user already present, skipped");
            report.skipped += 1;
        } else {
            info!(id = user.id, username = %user.username, "migrated user");
            report.inserted += 1;
        }
    }
    Ok(report)
}

async fn insert_meals(
    conn: &mut PgConnection,
    meals: &[LegacyMeal],
    now: DateTime<Utc>,
) -> Result<TableReport, MigrationError> {
    let mut report = TableReport::default();
    for meal in meals {
        let created_at = parse_legacy_timestamp(meal.created_at.as_deref(), now);
        let result = sqlx::query(
            "INSERT INTO meals (id, name, description, url, photo_filename, created_at, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(meal.id)
        .bind(&meal.name)
        .bind(&meal.description)
        .bind(&meal.url)
        .bind(&meal.photo_filename)
        .bind(created_at)
        .bind(meal.user_id)
        .execute(&mut *conn)
        .await
        .map_err(MigrationError::Target)?;

        if result.rows_affected() == 0 {
            debug!(id = meal.id, "meal already present, skipped");
            report.skipped += 1;
        } else {
            debug!(id = meal.id, "migrated meal");
            report.inserted += 1;
        }
    }
    Ok(report)
}

/// Move the id sequence past rows inserted with explicit ids
async fn advance_sequence(conn: &mut PgConnection, table: &str) -> Result<(), MigrationError> {
    let sql = format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
         COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
    );
    sqlx::query(&sql)
        .execute(&mut *conn)
        .await
        .map_err(MigrationError::Target)?;
    Ok(())
}

/// Copy users, then meals, inside one transaction on `target`
pub async fn migrate_records(
    legacy: &SqlitePool,
    target: &PgPool,
) -> Result<(TableReport, TableReport), MigrationError> {
    let users = read_legacy_users(legacy).await?;
    let meals = read_legacy_meals(legacy).await?;
    info!(users = users.len(), meals = meals.len(), "legacy rows read");

    let now = Utc::now();
    let mut tx = target.begin().await.map_err(MigrationError::Target)?;

    let user_report = insert_users(&mut *tx, &users, now).await?;
    let meal_report = insert_meals(&mut *tx, &meals, now).await?;
    advance_sequence(&mut *tx, "users").await?;
    advance_sequence(&mut *tx, "meals").await?;

    tx.commit().await.map_err(MigrationError::Target)?;

    counter!(MIGRATE_USERS).increment(user_report.inserted);
    counter!(MIGRATE_MEALS).increment(meal_report.inserted);
    info!(
        users = user_report.inserted,
        users_skipped = user_report.skipped,
        meals = meal_report.inserted,
        meals_skipped = meal_report.skipped,
        "records migrated"
    );
    Ok((user_report, meal_report))
}
