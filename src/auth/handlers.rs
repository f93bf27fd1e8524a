use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::Duration;
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, LoginRequest, MessageResponse, PublicUser, RefreshRequest,
            RegisterRequest, RegisterResponse, TokenResponse,
        },
        extractors::AuthUser,
        repo_types::User,
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/change-password", post(change_password))
        .route("/auth/logout", post(logout))
        .route("/auth/users", get(list_users))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let username = payload.username.trim();
    let (user, wallet) = services::register(
        &state.db,
        username,
        &payload.password,
        state.config.ledger.initial_balance,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            wallet_id: wallet.id,
        }),
    ))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let (user, pair, wallet) = services::login(
        &state.db,
        &state.tokens,
        payload.username.trim(),
        &payload.password,
    )
    .await?;

    Ok(Json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "bearer",
        user_id: user.id,
        wallet_id: wallet.map(|w| w.id),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let (user_id, pair) = services::refresh(&state.db, &state.tokens, &payload.refresh_token).await?;
    let wallet = crate::wallet::Wallet::find_by_user(&state.db, user_id).await?;

    Ok(Json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "bearer",
        user_id,
        wallet_id: wallet.map(|w| w.id),
    }))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn change_password(
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::change_password(
        &state.db,
        payload.username.trim(),
        &payload.old_password,
        &payload.new_password,
    )
    .await?;
    Ok(Json(MessageResponse {
        message: "password changed",
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<MessageResponse>> {
    let retention = Duration::hours(state.config.jwt.retention_hours);
    services::logout(&state.db, retention, user.id, &user.token).await?;
    Ok(Json(MessageResponse {
        message: "logged out",
    }))
}

#[instrument(skip(state, _user))]
pub async fn list_users(State(state): State<AppState>, _user: AuthUser) -> AppResult<Json<Vec<PublicUser>>> {
    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or(crate::error::AppError::UserNotFound)?;
    Ok(Json(PublicUser::from(user)))
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
