// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const ACCOUNT_TEMP_CREATED: &str = "account.temp_created";
pub const ACCOUNT_REGISTERED: &str = "account.registered";
pub const ACCOUNT_CONVERTED: &str = "account.converted";
pub const LOGIN_SUCCEEDED: &str = "login.succeeded";
pub const LOGIN_FAILED: &str = "login.failed";
pub const MEDIA_UPLOADED: &str = "media.uploaded";
pub const MEDIA_DELETE_FAILED: &str = "media.delete_failed";
pub const MIGRATE_USERS: &str = "migrate.users";
pub const MIGRATE_MEALS: &str = "migrate.meals";
pub const MIGRATE_PHOTOS: &str = "migrate.photos";
pub const MIGRATE_PHOTOS_FAILED: &str = "migrate.photos_failed";
