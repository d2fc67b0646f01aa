pub mod handlers;
pub mod repo;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub fn router(state: AppState) -> Router<AppState> {
    handlers::admin_routes(state)
}
