use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo_types::Wallet;
use crate::error::{AppError, AppResult};

/// Money has cent precision; more digits than that are refused, not rounded.
pub const MONEY_SCALE: u32 = 2;

/// Largest value a `NUMERIC(10,2)` column holds: 99,999,999.99.
pub const MAX_MONEY: Decimal = Decimal::from_parts(0x540B_E3FF, 2, 0, false, MONEY_SCALE);

pub fn validate_amount(amount: Decimal) -> AppResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(AppError::validation("amount must be positive"));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(AppError::validation("amount has more than 2 decimal places"));
    }
    if amount > MAX_MONEY {
        return Err(AppError::validation("amount exceeds 99999999.99"));
    }
    Ok(amount)
}

/// Balance after adding `amount`, refusing to pass [`MAX_MONEY`].
pub fn checked_credit(balance: Decimal, amount: Decimal) -> AppResult<Decimal> {
    match balance.checked_add(amount) {
        Some(total) if total <= MAX_MONEY => Ok(total),
        _ => Err(AppError::validation("balance would exceed 99999999.99")),
    }
}

/// Balance after taking `amount`, refusing to go negative.
pub fn checked_debit(balance: Decimal, amount: Decimal) -> AppResult<Decimal> {
    if amount > balance {
        return Err(AppError::InsufficientFunds);
    }
    Ok(balance - amount)
}

fn ensure_owner(wallet: &Wallet, user_id: Uuid) -> AppResult<()> {
    if wallet.user_id != user_id {
        return Err(AppError::Forbidden("wallet belongs to another user"));
    }
    Ok(())
}

#[instrument(skip(db))]
pub async fn get_own(db: &PgPool, user_id: Uuid, wallet_id: Uuid) -> AppResult<Wallet> {
    let wallet = Wallet::find_by_id(db, wallet_id)
        .await?
        .ok_or(AppError::WalletNotFound)?;
    ensure_owner(&wallet, user_id)?;
    Ok(wallet)
}

#[instrument(skip(db))]
pub async fn get_for_user(db: &PgPool, user_id: Uuid) -> AppResult<Wallet> {
    Wallet::find_by_user(db, user_id)
        .await?
        .ok_or(AppError::WalletNotFound)
}

#[instrument(skip(db), fields(amount = %amount))]
pub async fn credit(db: &PgPool, user_id: Uuid, wallet_id: Uuid, amount: Decimal) -> AppResult<Wallet> {
    let amount = validate_amount(amount)?;
    let mut tx = db.begin().await?;
    let wallet = Wallet::lock_by_id_tx(&mut tx, wallet_id)
        .await?
        .ok_or(AppError::WalletNotFound)?;
    ensure_owner(&wallet, user_id)?;
    if let Err(e) = checked_credit(wallet.balance, amount) {
        warn!(wallet_id = %wallet.id, balance = %wallet.balance, "credit refused");
        return Err(e);
    }
    let updated = Wallet::credit_tx(&mut tx, wallet.id, amount).await?;
    tx.commit().await?;
    info!(wallet_id = %updated.id, balance = %updated.balance, "wallet credited");
    Ok(updated)
}

#[instrument(skip(db), fields(amount = %amount))]
pub async fn debit(db: &PgPool, user_id: Uuid, wallet_id: Uuid, amount: Decimal) -> AppResult<Wallet> {
    let amount = validate_amount(amount)?;
    let mut tx = db.begin().await?;
    let wallet = Wallet::lock_by_id_tx(&mut tx, wallet_id)
        .await?
        .ok_or(AppError::WalletNotFound)?;
    ensure_owner(&wallet, user_id)?;
    if let Err(e) = checked_debit(wallet.balance, amount) {
        warn!(wallet_id = %wallet.id, balance = %wallet.balance, "debit refused");
        return Err(e);
    }
    let updated = Wallet::debit_tx(&mut tx, wallet.id, amount)
        .await?
        .ok_or(AppError::InsufficientFunds)?;
    tx.commit().await?;
    info!(wallet_id = %updated.id, balance = %updated.balance, "wallet debited");
    Ok(updated)
}
