use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Purchase, PurchaseDetailRow};

impl Purchase {
    pub async fn exists_tx(
        tx: &mut Transaction<'_, Postgres>,
        buyer_id: Uuid,
        photo_id: Uuid,
    ) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM purchases WHERE buyer_id = $1 AND photo_id = $2)",
        )
        .bind(buyer_id)
        .bind(photo_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Relies on the (buyer_id, photo_id) unique constraint to refuse duplicates.
    pub async fn insert_tx(
        tx: &mut Transaction<'_, Postgres>,
        buyer_id: Uuid,
        photo_id: Uuid,
        amount: Decimal,
    ) -> sqlx::Result<Purchase> {
        sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (id, buyer_id, photo_id, amount)
            VALUES ($1, $2, $3, $4)
            RETURNING id, buyer_id, photo_id, amount, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(buyer_id)
        .bind(photo_id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn list_by_buyer(db: &PgPool, buyer_id: Uuid) -> sqlx::Result<Vec<PurchaseDetailRow>> {
        sqlx::query_as::<_, PurchaseDetailRow>(
            r#"
            SELECT pu.id, pu.buyer_id, pu.photo_id, pu.amount, pu.created_at,
                   ph.author_id   AS photo_author_id,
                   ph.title       AS photo_title,
                   ph.description AS photo_description,
                   ph.price       AS photo_price,
                   ph.path        AS photo_path,
                   ph.created_at  AS photo_created_at,
                   ph.updated_at  AS photo_updated_at
              FROM purchases pu
              JOIN photos ph ON ph.id = pu.photo_id
             WHERE pu.buyer_id = $1
             ORDER BY pu.created_at ASC
            "#,
        )
        .bind(buyer_id)
        .fetch_all(db)
        .await
    }
}
