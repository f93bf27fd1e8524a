use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    claims::TokenKind,
    jwt::{TokenPair, TokenService},
    password::{hash_password_blocking, verify_password_blocking},
    repo_types::{TokenRecord, User},
};
use crate::{
    db,
    error::{AppError, AppResult},
    wallet::Wallet,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,50}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

pub(crate) fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("password too short"));
    }
    Ok(())
}

/// Creates the user and its wallet in one transaction.
#[instrument(skip(db, password))]
pub async fn register(
    db: &PgPool,
    username: &str,
    password: &str,
    initial_balance: Decimal,
) -> AppResult<(User, Wallet)> {
    if !is_valid_username(username) {
        warn!("invalid username");
        return Err(AppError::validation("invalid username"));
    }
    validate_password(password)?;

    if User::find_by_username(db, username).await?.is_some() {
        warn!("username already registered");
        return Err(AppError::DuplicateUsername);
    }

    let hash = hash_password_blocking(password.to_owned()).await?;

    let mut tx = db.begin().await?;
    let user = match User::create_tx(&mut tx, username, &hash).await {
        Ok(u) => u,
        // lost the race against a concurrent registration
        Err(e) if db::unique_violation(&e).is_some() => return Err(AppError::DuplicateUsername),
        Err(e) => return Err(e.into()),
    };
    let wallet = Wallet::create_tx(&mut tx, user.id, initial_balance).await?;
    tx.commit().await?;

    info!(user_id = %user.id, wallet_id = %wallet.id, "user registered");
    Ok((user, wallet))
}

/// Resolves a username/password pair to its user.
#[instrument(skip(db, password))]
pub async fn verify(db: &PgPool, username: &str, password: &str) -> AppResult<User> {
    let Some(user) = User::find_by_username(db, username).await? else {
        warn!("login unknown username");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password_blocking(password.to_owned(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }
    Ok(user)
}

/// Replaces the hash and revokes every outstanding token of the user.
#[instrument(skip(db, old_password, new_password))]
pub async fn change_password(
    db: &PgPool,
    username: &str,
    old_password: &str,
    new_password: &str,
) -> AppResult<()> {
    let Some(user) = User::find_by_username(db, username).await? else {
        warn!("change password for unknown username");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password_blocking(old_password.to_owned(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "invalid old password");
        return Err(AppError::InvalidOldPassword);
    }
    validate_password(new_password)?;

    let hash = hash_password_blocking(new_password.to_owned()).await?;
    let mut tx = db.begin().await?;
    User::update_password_tx(&mut tx, user.id, &hash).await?;
    let revoked = TokenRecord::deactivate_all_tx(&mut tx, user.id).await?;
    tx.commit().await?;

    info!(user_id = %user.id, revoked, "password changed");
    Ok(())
}

#[instrument(skip(db, tokens, password))]
pub async fn login(
    db: &PgPool,
    tokens: &TokenService,
    username: &str,
    password: &str,
) -> AppResult<(User, TokenPair, Option<Wallet>)> {
    let user = verify(db, username, password).await?;
    let pair = tokens.issue_pair(user.id)?;
    TokenRecord::insert(db, user.id, &pair.access_token, &pair.refresh_token).await?;
    let wallet = Wallet::find_by_user(db, user.id).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, pair, wallet))
}

/// Best-effort cleanup of stale records, then revokes the presented token.
#[instrument(skip(db, access_token))]
pub async fn logout(
    db: &PgPool,
    retention: Duration,
    user_id: Uuid,
    access_token: &str,
) -> AppResult<()> {
    let cutoff = OffsetDateTime::now_utc() - retention;
    match TokenRecord::purge_stale(db, cutoff).await {
        Ok(purged) if purged > 0 => info!(purged, "stale token records purged"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "stale token cleanup failed; continuing"),
    }

    if !TokenRecord::deactivate(db, user_id, access_token).await? {
        warn!(%user_id, "logout for token without a record");
    }
    info!(%user_id, "user logged out");
    Ok(())
}

/// Trades a refresh token for a new pair. Each refresh token works once.
#[instrument(skip(db, tokens, refresh_token))]
pub async fn refresh(
    db: &PgPool,
    tokens: &TokenService,
    refresh_token: &str,
) -> AppResult<(Uuid, TokenPair)> {
    let claims = tokens.decode(refresh_token, TokenKind::Refresh)?;

    let mut tx = db.begin().await?;
    let record = TokenRecord::lock_by_refresh_tx(&mut tx, claims.sub, refresh_token)
        .await?
        .filter(|r| r.active);
    let Some(record) = record else {
        warn!(user_id = %claims.sub, "refresh with revoked or unknown token");
        return Err(AppError::Unauthorized("refresh token revoked"));
    };
    if User::find_by_id(db, claims.sub).await?.is_none() {
        return Err(AppError::Unauthorized("user no longer exists"));
    }

    TokenRecord::deactivate(&mut *tx, record.user_id, &record.access_token).await?;
    let pair = tokens.issue_pair(claims.sub)?;
    TokenRecord::insert(&mut *tx, claims.sub, &pair.access_token, &pair.refresh_token).await?;
    tx.commit().await?;

    info!(user_id = %claims.sub, "tokens refreshed");
    Ok((claims.sub, pair))
}
