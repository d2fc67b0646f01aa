use axum::{
    extract::{Path, Request, State},
    middleware::{self, Next},
    routing::patch,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo_types::Role;
use crate::{
    auth::{
        dto::UserEnvelope,
        extractors::CurrentUser,
        gate::{authenticate, require_role},
    },
    error::{ApiResponse, AppError},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    pub verified: bool,
}

/// Admin-only user management.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/:id/verification", patch(set_verification))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require_role(Role::Admin, req, next)
        }))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

#[instrument(skip(state, admin, payload), fields(admin_id = %admin.id))]
pub async fn set_verification(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<VerificationRequest>, AppError>,
) -> Result<ApiResponse<UserEnvelope>, AppError> {
    let not_found = || AppError::NotFound("User not found".into());
    let id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let user = state
        .users
        .set_verified(id, payload.verified)
        .await?
        .ok_or_else(not_found)?;
    info!(user_id = %user.id, verified = payload.verified, "user verification updated");
    Ok(ApiResponse::with_message(
        "User verification updated",
        UserEnvelope { user: user.into() },
    ))
}
