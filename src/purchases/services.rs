//! Purchase orchestration: one buyer, one photo, one wallet debit.
//!
//! Every attempt runs in a single transaction. The photo row is share-locked
//! so its price is fixed for the attempt, the buyer's wallet row is locked
//! `FOR UPDATE` before the balance check, and the `(buyer_id, photo_id)`
//! unique constraint is the final word on duplicates. Any early return drops
//! the transaction, which rolls back the debit.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo_types::{Purchase, PurchaseDetail};
use crate::{
    db,
    error::{AppError, AppResult},
    photos::Photo,
    wallet::{services::checked_debit, Wallet},
};

/// Photo-level rules, checked before any wallet is touched.
pub fn ensure_purchasable(buyer_id: Uuid, photo: &Photo, already_purchased: bool) -> AppResult<()> {
    if photo.author_id == buyer_id {
        return Err(AppError::SelfPurchaseForbidden);
    }
    if already_purchased {
        return Err(AppError::AlreadyPurchased);
    }
    Ok(())
}

pub fn ensure_funds(wallet: &Wallet, price: Decimal) -> AppResult<Decimal> {
    checked_debit(wallet.balance, price)
}

async fn attempt(db: &PgPool, buyer_id: Uuid, photo_id: Uuid) -> AppResult<Purchase> {
    let mut tx = db.begin().await?;

    let photo = Photo::find_for_share_tx(&mut tx, photo_id)
        .await?
        .ok_or(AppError::PhotoNotFound)?;
    let already = Purchase::exists_tx(&mut tx, buyer_id, photo_id).await?;
    ensure_purchasable(buyer_id, &photo, already)?;

    let wallet = Wallet::lock_by_user_tx(&mut tx, buyer_id)
        .await?
        .ok_or(AppError::WalletNotFound)?;
    ensure_funds(&wallet, photo.price)?;

    let debited = Wallet::debit_tx(&mut tx, wallet.id, photo.price)
        .await?
        .ok_or(AppError::InsufficientFunds)?;

    let purchase = match Purchase::insert_tx(&mut tx, buyer_id, photo_id, photo.price).await {
        Ok(p) => p,
        Err(e) if db::unique_violation(&e).is_some() => return Err(AppError::AlreadyPurchased),
        Err(e) => return Err(e.into()),
    };

    tx.commit().await?;
    info!(
        purchase_id = %purchase.id,
        %buyer_id,
        %photo_id,
        amount = %purchase.amount,
        balance = %debited.balance,
        "purchase committed"
    );
    Ok(purchase)
}

/// Buys `photo_id` for `buyer_id`, retrying transient transaction aborts.
#[instrument(skip(db))]
pub async fn purchase(db: &PgPool, buyer_id: Uuid, photo_id: Uuid, max_attempts: u32) -> AppResult<Purchase> {
    let max_attempts = max_attempts.max(1);
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt(db, buyer_id, photo_id).await {
            Err(AppError::Storage(e)) if db::is_transient(&e) && tries < max_attempts => {
                warn!(error = %e, tries, "purchase transaction aborted; retrying");
            }
            Err(e @ (AppError::Storage(_) | AppError::Internal(_))) => return Err(e),
            Err(e) => {
                warn!(error = %e, "purchase refused");
                return Err(e);
            }
            Ok(p) => return Ok(p),
        }
    }
}

/// Purchase history of `buyer_id`; callers may only read their own.
#[instrument(skip(db))]
pub async fn history(db: &PgPool, caller_id: Uuid, buyer_id: Uuid) -> AppResult<Vec<PurchaseDetail>> {
    if caller_id != buyer_id {
        return Err(AppError::Forbidden("not authorized to view this user's purchases"));
    }
    let rows = Purchase::list_by_buyer(db, buyer_id).await?;
    Ok(rows.into_iter().map(PurchaseDetail::from).collect())
}
