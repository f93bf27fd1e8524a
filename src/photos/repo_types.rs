use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Photo listing. `path` is the file-store key of the uploaded image.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Photo {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub path: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Columns an author may edit.
#[derive(Debug, Clone)]
pub struct PhotoChanges {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
}
