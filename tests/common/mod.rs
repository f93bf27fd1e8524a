#![allow(dead_code)]

use bytes::Bytes;
use gallery::{
    auth::{jwt::TokenService, services as auth},
    config::JwtConfig,
    photos::{services as photos, Photo},
    storage::{LocalStorage, StorageClient},
    wallet::Wallet,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;

pub const PASSWORD: &str = "correct-horse";
pub const INITIAL: Decimal = dec!(30.00);

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        access_secret: "it-access".into(),
        refresh_secret: "it-refresh".into(),
        issuer: "gallery".into(),
        audience: "gallery-users".into(),
        access_ttl_minutes: 30,
        refresh_ttl_minutes: 60,
        retention_hours: 24,
    }
}

pub fn token_service() -> TokenService {
    TokenService::new(&jwt_config())
}

pub async fn register(db: &PgPool, username: &str) -> (uuid::Uuid, Wallet) {
    let (user, wallet) = auth::register(db, username, PASSWORD, INITIAL).await.unwrap();
    (user.id, wallet)
}

pub async fn storage() -> (tempfile::TempDir, LocalStorage) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStorage::new(dir.path()).await.unwrap();
    (dir, store)
}

pub async fn publish(
    db: &PgPool,
    storage: &dyn StorageClient,
    author: uuid::Uuid,
    title: &str,
    price: Decimal,
) -> Photo {
    photos::create(
        db,
        storage,
        author,
        photos::NewPhoto {
            title: title.into(),
            description: String::new(),
            price,
            file: Bytes::from_static(b"\x89PNG fake"),
            content_type: "image/png".into(),
            filename: Some("shot.png".into()),
        },
    )
    .await
    .unwrap()
}
