use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Photo, PhotoChanges};

const PHOTO_COLUMNS: &str =
    "id, author_id, title, description, price, path, created_at, updated_at";

impl Photo {
    pub async fn insert(
        db: &PgPool,
        id: Uuid,
        author_id: Uuid,
        title: &str,
        description: &str,
        price: Decimal,
        path: &str,
    ) -> sqlx::Result<Photo> {
        sqlx::query_as::<_, Photo>(&format!(
            r#"
            INSERT INTO photos (id, author_id, title, description, price, path)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PHOTO_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(author_id)
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(path)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Photo>> {
        sqlx::query_as::<_, Photo>(&format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Shares-locks the row so its price cannot change before the transaction ends.
    pub async fn find_for_share_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> sqlx::Result<Option<Photo>> {
        sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1 FOR SHARE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn list(db: &PgPool) -> sqlx::Result<Vec<Photo>> {
        sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await
    }

    /// Whether another photo already uses `title`.
    pub async fn title_taken(db: &PgPool, title: &str, except: Option<Uuid>) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM photos WHERE title = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(title)
        .bind(except)
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &PgPool, id: Uuid, changes: &PhotoChanges) -> sqlx::Result<Photo> {
        sqlx::query_as::<_, Photo>(&format!(
            r#"
            UPDATE photos
               SET title = $2,
                   description = COALESCE($3, description),
                   price = COALESCE($4, price),
                   updated_at = now()
             WHERE id = $1
            RETURNING {PHOTO_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.price)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM photos WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
