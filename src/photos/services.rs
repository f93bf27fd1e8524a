use anyhow::Context;
use bytes::Bytes;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo_types::{Photo, PhotoChanges};
use crate::{
    db,
    error::{AppError, AppResult},
    storage::{ext_from_mime, is_valid_key, mime_from_key, StorageClient},
    wallet::services::{MAX_MONEY, MONEY_SCALE},
};

pub const MAX_TITLE_LEN: usize = 255;

/// Everything needed to publish a photo.
pub struct NewPhoto {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub file: Bytes,
    pub content_type: String,
    pub filename: Option<String>,
}

pub(crate) fn validate_title(title: &str) -> AppResult<()> {
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(AppError::validation("title must be 1 to 255 characters"));
    }
    Ok(())
}

pub(crate) fn validate_price(price: Decimal) -> AppResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::validation("price must not be negative"));
    }
    if price.normalize().scale() > MONEY_SCALE {
        return Err(AppError::validation("price has more than 2 decimal places"));
    }
    if price > MAX_MONEY {
        return Err(AppError::validation("price exceeds 99999999.99"));
    }
    Ok(())
}

/// Picks the stored file's extension from the MIME type, falling back to the upload name.
fn file_extension(content_type: &str, filename: Option<&str>) -> String {
    if let Some(ext) = ext_from_mime(content_type) {
        return ext.to_string();
    }
    filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

fn ensure_author(photo: &Photo, user_id: Uuid, action: &'static str) -> AppResult<()> {
    if photo.author_id != user_id {
        warn!(photo_id = %photo.id, %user_id, action, "not the author");
        return Err(AppError::Forbidden(action));
    }
    Ok(())
}

#[instrument(skip(db, storage, new), fields(title = %new.title))]
pub async fn create(
    db: &PgPool,
    storage: &dyn StorageClient,
    author_id: Uuid,
    new: NewPhoto,
) -> AppResult<Photo> {
    let title = new.title.trim();
    validate_title(title)?;
    validate_price(new.price)?;
    if new.file.is_empty() {
        return Err(AppError::validation("file is required"));
    }
    if Photo::title_taken(db, title, None).await? {
        return Err(AppError::DuplicateTitle);
    }

    let id = Uuid::new_v4();
    let key = format!("{}.{}", id, file_extension(&new.content_type, new.filename.as_deref()));
    storage
        .put_object(&key, new.file, &new.content_type)
        .await
        .with_context(|| format!("store photo file {key}"))?;

    let inserted = Photo::insert(db, id, author_id, title, &new.description, new.price, &key).await;
    match inserted {
        Ok(photo) => {
            info!(photo_id = %photo.id, %author_id, "photo created");
            Ok(photo)
        }
        Err(e) => {
            if let Err(cleanup) = storage.delete_object(&key).await {
                warn!(error = %cleanup, %key, "orphaned photo file");
            }
            if db::unique_violation(&e).is_some() {
                return Err(AppError::DuplicateTitle);
            }
            Err(e.into())
        }
    }
}

pub async fn get(db: &PgPool, id: Uuid) -> AppResult<Photo> {
    Photo::find_by_id(db, id).await?.ok_or(AppError::PhotoNotFound)
}

pub async fn list(db: &PgPool) -> AppResult<Vec<Photo>> {
    Ok(Photo::list(db).await?)
}

/// Price edits only affect future purchases; recorded amounts are snapshots.
#[instrument(skip(db, changes))]
pub async fn update(db: &PgPool, user_id: Uuid, id: Uuid, changes: PhotoChanges) -> AppResult<Photo> {
    let photo = get(db, id).await?;
    ensure_author(&photo, user_id, "only the author may update this photo")?;

    let changes = PhotoChanges {
        title: changes.title.trim().to_string(),
        ..changes
    };
    validate_title(&changes.title)?;
    if let Some(price) = changes.price {
        validate_price(price)?;
    }
    if Photo::title_taken(db, &changes.title, Some(id)).await? {
        return Err(AppError::DuplicateTitle);
    }

    match Photo::update(db, id, &changes).await {
        Ok(updated) => {
            info!(photo_id = %id, "photo updated");
            Ok(updated)
        }
        Err(e) if db::unique_violation(&e).is_some() => Err(AppError::DuplicateTitle),
        Err(sqlx::Error::RowNotFound) => Err(AppError::PhotoNotFound),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(db, storage))]
pub async fn delete(db: &PgPool, storage: &dyn StorageClient, user_id: Uuid, id: Uuid) -> AppResult<()> {
    let photo = get(db, id).await?;
    ensure_author(&photo, user_id, "only the author may delete this photo")?;

    match Photo::delete(db, id).await {
        Ok(()) => {}
        Err(e) if db::is_foreign_key_violation(&e) => return Err(AppError::PhotoInUse),
        Err(e) => return Err(e.into()),
    }
    if let Some(key) = photo.path.as_deref() {
        if let Err(e) = storage.delete_object(key).await {
            warn!(error = %e, %key, "failed to remove photo file");
        }
    }
    info!(photo_id = %id, "photo deleted");
    Ok(())
}

/// Raw file bytes and their content type.
pub async fn fetch_file(storage: &dyn StorageClient, name: &str) -> AppResult<(Bytes, &'static str)> {
    if !is_valid_key(name) {
        return Err(AppError::FileNotFound);
    }
    let data = storage.get_object(name).await?.ok_or(AppError::FileNotFound)?;
    Ok((data, mime_from_key(name)))
}
