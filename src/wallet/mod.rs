use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo_types::Wallet;

pub fn router() -> Router<AppState> {
    handlers::wallet_routes()
}
