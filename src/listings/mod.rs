pub mod categories;
pub mod dto;
pub mod handlers;
pub mod query;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

use crate::state::AppState;
use axum::Router;

pub fn router(state: AppState) -> Router<AppState> {
    handlers::routes(state)
}
