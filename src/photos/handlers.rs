use std::str::FromStr;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreatedPhotoResponse, UpdatePhotoRequest},
    repo_types::{Photo, PhotoChanges},
    services::{self, NewPhoto},
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/photos", get(list_photos))
        .route("/photos/:id", get(get_photo))
        .route("/photos/file/:name", get(get_file))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/photos", axum::routing::post(create_photo))
        .route(
            "/photos/:id",
            axum::routing::put(update_photo).delete(delete_photo),
        )
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state, _user))]
pub async fn list_photos(State(state): State<AppState>, _user: AuthUser) -> AppResult<Json<Vec<Photo>>> {
    Ok(Json(services::list(&state.db).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_photo(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Photo>> {
    Ok(Json(services::get(&state.db, id).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_file(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (data, content_type) = services::fetch_file(state.storage.as_ref(), &name).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

/// POST /photos (multipart): title, description, price, file
#[instrument(skip(state, user, mp), fields(user_id = %user.id))]
pub async fn create_photo(
    State(state): State<AppState>,
    user: AuthUser,
    mut mp: Multipart,
) -> AppResult<(StatusCode, HeaderMap, Json<CreatedPhotoResponse>)> {
    let mut title = None;
    let mut description = String::new();
    let mut price = None;
    let mut file: Option<(Bytes, String, Option<String>)> = None;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("title") => title = Some(text(field).await?),
            Some("description") => description = text(field).await?,
            Some("price") => {
                let raw = text(field).await?;
                let parsed = Decimal::from_str(raw.trim())
                    .map_err(|_| AppError::validation("price must be a decimal number"))?;
                price = Some(parsed);
            }
            Some("file") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let filename = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("invalid file field: {e}")))?;
                file = Some((data, content_type, filename));
            }
            _ => {}
        }
    }

    let title = title.ok_or_else(|| AppError::validation("title is required"))?;
    let price = price.ok_or_else(|| AppError::validation("price is required"))?;
    let (data, content_type, filename) = file.ok_or_else(|| AppError::validation("file is required"))?;

    let photo = services::create(
        &state.db,
        state.storage.as_ref(),
        user.id,
        NewPhoto {
            title,
            description,
            price,
            file: data,
            content_type,
            filename,
        },
    )
    .await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/photos/{}", photo.id).parse() {
        headers.insert(header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(CreatedPhotoResponse {
            id: photo.id,
            title: photo.title,
            path: photo.path,
        }),
    ))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_photo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePhotoRequest>,
) -> AppResult<Json<Photo>> {
    let changes = PhotoChanges {
        title: body.title,
        description: body.description,
        price: body.price,
    };
    Ok(Json(services::update(&state.db, user.id, id, changes).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_photo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state.db, state.storage.as_ref(), user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("invalid text field: {e}")))
}
