use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{TokenRecord, User};

const USER_COLUMNS: &str = "id, username, password_hash, created_at, updated_at";

impl User {
    /// Find a user by username.
    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &PgPool) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(db)
        .await
    }

    /// Insert a user inside the registration transaction.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        username: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn update_password_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        password_hash: &str,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

impl TokenRecord {
    pub async fn insert<'e, E: PgExecutor<'e>>(
        db: E,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tokens (access_token, user_id, refresh_token, active)
            VALUES ($1, $2, $3, TRUE)
            "#,
        )
        .bind(access_token)
        .bind(user_id)
        .bind(refresh_token)
        .execute(db)
        .await?;
        Ok(())
    }

    /// `false` when the record was revoked or never existed.
    pub async fn is_active(db: &PgPool, user_id: Uuid, access_token: &str) -> sqlx::Result<bool> {
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT active FROM tokens WHERE user_id = $1 AND access_token = $2",
        )
        .bind(user_id)
        .bind(access_token)
        .fetch_optional(db)
        .await?;
        Ok(active.unwrap_or(false))
    }

    pub async fn lock_by_refresh_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        refresh_token: &str,
    ) -> sqlx::Result<Option<TokenRecord>> {
        sqlx::query_as::<_, TokenRecord>(
            r#"
            SELECT access_token, user_id, refresh_token, active, created_at
              FROM tokens
             WHERE user_id = $1 AND refresh_token = $2
             FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(refresh_token)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Returns whether a record was found and flipped.
    pub async fn deactivate<'e, E: PgExecutor<'e>>(
        db: E,
        user_id: Uuid,
        access_token: &str,
    ) -> sqlx::Result<bool> {
        let res = sqlx::query(
            "UPDATE tokens SET active = FALSE WHERE user_id = $1 AND access_token = $2",
        )
        .bind(user_id)
        .bind(access_token)
        .execute(db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn deactivate_all_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> sqlx::Result<u64> {
        let res = sqlx::query("UPDATE tokens SET active = FALSE WHERE user_id = $1 AND active")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(res.rows_affected())
    }

    /// Drops every record of any user holding a record issued before `cutoff`.
    pub async fn purge_stale(db: &PgPool, cutoff: OffsetDateTime) -> sqlx::Result<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM tokens
             WHERE user_id IN (SELECT DISTINCT user_id FROM tokens WHERE created_at < $1)
            "#,
        )
        .bind(cutoff)
        .execute(db)
        .await?;
        Ok(res.rows_affected())
    }
}
