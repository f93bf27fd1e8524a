use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::Wallet;

const WALLET_COLUMNS: &str = "id, user_id, balance, created_at, updated_at";

impl Wallet {
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        balance: Decimal,
    ) -> sqlx::Result<Wallet> {
        sqlx::query_as::<_, Wallet>(&format!(
            r#"
            INSERT INTO wallets (id, user_id, balance)
            VALUES ($1, $2, $3)
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(balance)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Option<Wallet>> {
        sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Wallet>> {
        sqlx::query_as::<_, Wallet>(&format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Row-locks the buyer's wallet until the surrounding transaction ends.
    pub async fn lock_by_user_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> sqlx::Result<Option<Wallet>> {
        sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn lock_by_id_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> sqlx::Result<Option<Wallet>> {
        sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn credit_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        amount: Decimal,
    ) -> sqlx::Result<Wallet> {
        sqlx::query_as::<_, Wallet>(&format!(
            r#"
            UPDATE wallets SET balance = balance + $2, updated_at = now()
             WHERE id = $1
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await
    }

    /// `None` if the balance would go negative; the row is left untouched.
    pub async fn debit_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        amount: Decimal,
    ) -> sqlx::Result<Option<Wallet>> {
        sqlx::query_as::<_, Wallet>(&format!(
            r#"
            UPDATE wallets SET balance = balance - $2, updated_at = now()
             WHERE id = $1 AND balance >= $2
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(amount)
        .fetch_optional(&mut **tx)
        .await
    }
}
