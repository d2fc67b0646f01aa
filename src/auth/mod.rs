use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod services;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes(state))
}
