use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::photos::Photo;

/// Immutable record of a completed purchase. `amount` is the price paid.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub photo_id: Uuid,
    pub amount: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Purchase joined with the photo it bought, as one flat row.
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseDetailRow {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub photo_id: Uuid,
    pub amount: Decimal,
    pub created_at: OffsetDateTime,
    pub photo_author_id: Uuid,
    pub photo_title: String,
    pub photo_description: String,
    pub photo_price: Decimal,
    pub photo_path: Option<String>,
    pub photo_created_at: OffsetDateTime,
    pub photo_updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseDetail {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub photo: Photo,
}

impl From<PurchaseDetailRow> for PurchaseDetail {
    fn from(r: PurchaseDetailRow) -> Self {
        Self {
            purchase: Purchase {
                id: r.id,
                buyer_id: r.buyer_id,
                photo_id: r.photo_id,
                amount: r.amount,
                created_at: r.created_at,
            },
            photo: Photo {
                id: r.photo_id,
                author_id: r.photo_author_id,
                title: r.photo_title,
                description: r.photo_description,
                price: r.photo_price,
                path: r.photo_path,
                created_at: r.photo_created_at,
                updated_at: r.photo_updated_at,
            },
        }
    }
}
