use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{dto::AmountRequest, repo_types::Wallet, services};
use crate::{auth::extractors::AuthUser, error::AppResult, state::AppState};

pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/wallets/me", get(get_my_wallet))
        .route("/wallets/:id", get(get_wallet))
        .route("/wallets/:id/increase_balance", put(increase_balance))
        .route("/wallets/:id/decrease_balance", put(decrease_balance))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_my_wallet(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Wallet>> {
    Ok(Json(services::get_for_user(&state.db, user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_wallet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Wallet>> {
    Ok(Json(services::get_own(&state.db, user.id, id).await?))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn increase_balance(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AmountRequest>,
) -> AppResult<Json<Wallet>> {
    Ok(Json(services::credit(&state.db, user.id, id, body.amount).await?))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn decrease_balance(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AmountRequest>,
) -> AppResult<Json<Wallet>> {
    Ok(Json(services::debit(&state.db, user.id, id, body.amount).await?))
}
