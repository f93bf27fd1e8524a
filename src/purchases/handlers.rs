use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::CreatePurchaseRequest,
    repo_types::{Purchase, PurchaseDetail},
    services,
};
use crate::{auth::extractors::AuthUser, error::AppResult, state::AppState};

pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/purchases", post(create_purchase))
        .route("/purchases/user/:user_id", get(list_purchases_by_user))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id, photo_id = %body.photo_id))]
pub async fn create_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreatePurchaseRequest>,
) -> AppResult<(StatusCode, Json<Purchase>)> {
    let purchase = services::purchase(
        &state.db,
        user.id,
        body.photo_id,
        state.config.ledger.purchase_max_attempts,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

#[instrument(skip(state, user), fields(caller = %user.id))]
pub async fn list_purchases_by_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<PurchaseDetail>>> {
    Ok(Json(services::history(&state.db, user.id, user_id).await?))
}
