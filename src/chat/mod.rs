pub mod dto;
pub mod handlers;
pub mod repo;
mod repo_types;
pub mod services;
pub mod store;
pub mod tools;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::chat_routes()
}
