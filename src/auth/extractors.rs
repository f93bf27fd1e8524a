use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::{
    claims::TokenKind,
    jwt::TokenService,
    repo_types::{TokenRecord, User},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

/// Authenticated caller, resolved from a live access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    /// The presented access token, needed by logout.
    pub token: String,
}

/// Pulls `<token>` out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized("missing Authorization header"))?;

    let (scheme, token) = auth
        .split_once(' ')
        .ok_or(AppError::Unauthorized("invalid auth scheme"))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::Unauthorized("invalid auth scheme"));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized("missing bearer token"));
    }
    Ok(token)
}

/// Read-only gate: signature and expiry, then revocation, then the user row.
pub async fn authenticate(db: &PgPool, tokens: &TokenService, headers: &HeaderMap) -> AppResult<AuthUser> {
    let token = bearer_token(headers)?;

    let claims = tokens.decode(token, TokenKind::Access).map_err(|e| {
        warn!(error = %e, "rejected access token");
        AppError::Token(e)
    })?;

    if !TokenRecord::is_active(db, claims.sub, token).await? {
        warn!(user_id = %claims.sub, "revoked or unknown access token");
        return Err(AppError::Unauthorized("token revoked"));
    }

    let user = User::find_by_id(db, claims.sub)
        .await?
        .ok_or(AppError::Unauthorized("user not found"))?;

    Ok(AuthUser {
        id: user.id,
        username: user.username,
        token: token.to_owned(),
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(&state.db, &state.tokens, &parts.headers).await
    }
}
