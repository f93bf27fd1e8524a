use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub username: String,           // unique login name
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, not exposed in JSON
    pub created_at: OffsetDateTime, // creation timestamp
    pub updated_at: OffsetDateTime, // last password change
}

/// One issued access/refresh pair. `active = false` means revoked.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRecord {
    pub access_token: String,
    pub user_id: Uuid,
    pub refresh_token: String,
    pub active: bool,
    pub created_at: OffsetDateTime,
}
