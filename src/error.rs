use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::jwt::TokenError;

/// Coarse failure classes every [`AppError`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    Conflict,
    BusinessRule,
    Forbidden,
    Storage,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid old password")]
    InvalidOldPassword,
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("unauthorized: {0}")]
    Token(#[from] TokenError),

    #[error("user not found")]
    UserNotFound,
    #[error("photo not found")]
    PhotoNotFound,
    #[error("wallet not found")]
    WalletNotFound,
    #[error("file not found")]
    FileNotFound,

    #[error("username already registered")]
    DuplicateUsername,
    #[error("photo with this title already exists")]
    DuplicateTitle,
    #[error("photo already purchased")]
    AlreadyPurchased,
    #[error("photo has purchases and cannot be deleted")]
    PhotoInUse,

    #[error("cannot purchase your own photo")]
    SelfPurchaseForbidden,
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("storage failure")]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: ErrorKind,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Token(TokenError::Signing) | Self::Internal(_) => ErrorKind::Internal,
            Self::InvalidCredentials
            | Self::InvalidOldPassword
            | Self::Unauthorized(_)
            | Self::Token(_) => ErrorKind::Auth,
            Self::UserNotFound | Self::PhotoNotFound | Self::WalletNotFound | Self::FileNotFound => {
                ErrorKind::NotFound
            }
            Self::DuplicateUsername
            | Self::DuplicateTitle
            | Self::AlreadyPurchased
            | Self::PhotoInUse => ErrorKind::Conflict,
            Self::SelfPurchaseForbidden | Self::InsufficientFunds => ErrorKind::BusinessRule,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidOldPassword => StatusCode::BAD_REQUEST,
            Self::Token(TokenError::Signing) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidCredentials | Self::Unauthorized(_) | Self::Token(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::UserNotFound | Self::PhotoNotFound | Self::WalletNotFound | Self::FileNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::DuplicateUsername | Self::DuplicateTitle | Self::PhotoInUse => {
                StatusCode::CONFLICT
            }
            // Purchase rejections are client errors on the purchase endpoint.
            Self::AlreadyPurchased | Self::SelfPurchaseForbidden | Self::InsufficientFunds => {
                StatusCode::BAD_REQUEST
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Storage(e) => {
                error!(error = %e, "storage failure");
                "internal server error".to_string()
            }
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorBody {
            error: message,
            code: self.kind(),
        });
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
