//! Database-backed purchase scenarios. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

mod common;

use common::{publish, register, storage, INITIAL};
use gallery::{
    error::AppError,
    photos::{repo_types::PhotoChanges, services as photos},
    purchases::services as purchases,
    wallet::Wallet,
};
use rust_decimal_macros::dec;
use sqlx::PgPool;

async fn balance(db: &PgPool, user_id: uuid::Uuid) -> rust_decimal::Decimal {
    Wallet::find_by_user(db, user_id).await.unwrap().unwrap().balance
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn registration_opens_funded_wallet(db: PgPool) {
    let (id, wallet) = register(&db, "alice").await;
    assert_eq!(wallet.user_id, id);
    assert_eq!(wallet.balance, INITIAL);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn buy_once_then_refused(db: PgPool) {
    let (_dir, store) = storage().await;
    let (alice, _) = register(&db, "alice").await;
    let (bob, _) = register(&db, "bob").await;
    let photo = publish(&db, &store, bob, "sunset", dec!(10.00)).await;

    let p = purchases::purchase(&db, alice, photo.id, 3).await.unwrap();
    assert_eq!(p.amount, dec!(10.00));
    assert_eq!(p.buyer_id, alice);
    assert_eq!(balance(&db, alice).await, dec!(20.00));

    let again = purchases::purchase(&db, alice, photo.id, 3).await;
    assert!(matches!(again, Err(AppError::AlreadyPurchased)));
    assert_eq!(balance(&db, alice).await, dec!(20.00));

    // the seller is not credited
    assert_eq!(balance(&db, bob).await, INITIAL);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn own_photo_is_refused(db: PgPool) {
    let (_dir, store) = storage().await;
    let (bob, _) = register(&db, "bob").await;
    let photo = publish(&db, &store, bob, "mine", dec!(1.00)).await;

    let res = purchases::purchase(&db, bob, photo.id, 3).await;
    assert!(matches!(res, Err(AppError::SelfPurchaseForbidden)));
    assert_eq!(balance(&db, bob).await, INITIAL);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn insufficient_funds_leaves_no_trace(db: PgPool) {
    let (_dir, store) = storage().await;
    let (alice, _) = register(&db, "alice").await;
    let (bob, _) = register(&db, "bob").await;
    let photo = publish(&db, &store, bob, "pricey", dec!(30.01)).await;

    let res = purchases::purchase(&db, alice, photo.id, 3).await;
    assert!(matches!(res, Err(AppError::InsufficientFunds)));
    assert_eq!(balance(&db, alice).await, INITIAL);
    assert!(purchases::history(&db, alice, alice).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn exact_balance_is_enough(db: PgPool) {
    let (_dir, store) = storage().await;
    let (alice, _) = register(&db, "alice").await;
    let (bob, _) = register(&db, "bob").await;
    let photo = publish(&db, &store, bob, "all-in", INITIAL).await;

    purchases::purchase(&db, alice, photo.id, 3).await.unwrap();
    assert_eq!(balance(&db, alice).await, dec!(0.00));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn unknown_photo_is_not_found(db: PgPool) {
    let (alice, _) = register(&db, "alice").await;
    let res = purchases::purchase(&db, alice, uuid::Uuid::new_v4(), 3).await;
    assert!(matches!(res, Err(AppError::PhotoNotFound)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn later_price_change_keeps_recorded_amount(db: PgPool) {
    let (_dir, store) = storage().await;
    let (alice, _) = register(&db, "alice").await;
    let (bob, _) = register(&db, "bob").await;
    let photo = publish(&db, &store, bob, "river", dec!(5.00)).await;

    purchases::purchase(&db, alice, photo.id, 3).await.unwrap();
    photos::update(
        &db,
        bob,
        photo.id,
        PhotoChanges {
            title: "river".into(),
            description: None,
            price: Some(dec!(25.00)),
        },
    )
    .await
    .unwrap();

    let history = purchases::history(&db, alice, alice).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].purchase.amount, dec!(5.00));
    assert_eq!(history[0].photo.price, dec!(25.00));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn purchased_photo_cannot_be_deleted(db: PgPool) {
    let (_dir, store) = storage().await;
    let (alice, _) = register(&db, "alice").await;
    let (bob, _) = register(&db, "bob").await;
    let photo = publish(&db, &store, bob, "keeper", dec!(2.00)).await;
    purchases::purchase(&db, alice, photo.id, 3).await.unwrap();

    let res = photos::delete(&db, &store, bob, photo.id).await;
    assert!(matches!(res, Err(AppError::PhotoInUse)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn history_is_owner_only(db: PgPool) {
    let (alice, _) = register(&db, "alice").await;
    let (bob, _) = register(&db, "bob").await;
    let res = purchases::history(&db, bob, alice).await;
    assert!(matches!(res, Err(AppError::Forbidden(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_duplicates_charge_once(db: PgPool) {
    let (_dir, store) = storage().await;
    let (alice, _) = register(&db, "alice").await;
    let (bob, _) = register(&db, "bob").await;
    let photo = publish(&db, &store, bob, "race", dec!(7.00)).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { purchases::purchase(&db, alice, photo.id, 3).await })
        })
        .collect();

    let mut ok = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(AppError::AlreadyPurchased) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(balance(&db, alice).await, dec!(23.00));
    assert_eq!(purchases::history(&db, alice, alice).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_purchases_never_overdraw(db: PgPool) {
    let (_dir, store) = storage().await;
    let (alice, _) = register(&db, "alice").await;
    let (bob, _) = register(&db, "bob").await;

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(publish(&db, &store, bob, &format!("p{i}"), dec!(10.00)).await.id);
    }

    let handles: Vec<_> = ids
        .into_iter()
        .map(|photo_id| {
            let db = db.clone();
            tokio::spawn(async move { purchases::purchase(&db, alice, photo_id, 3).await })
        })
        .collect();

    let mut ok = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(AppError::InsufficientFunds) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 3);
    assert_eq!(balance(&db, alice).await, dec!(0.00));
}
