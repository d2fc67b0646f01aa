//! Request gates: identity resolution and role/verification checks.
//!
//! `authenticate` and `authenticate_optional` attach the caller to the request
//! extensions; the other gates only read what was attached upstream.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::extractors::{resolve_identity, resolve_optional, CurrentUser, MaybeUser};
use crate::{error::AppError, state::AppState, users::repo_types::Role};

pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_identity(&state, req.headers()).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

pub async fn authenticate_optional(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let user = resolve_optional(&state, req.headers()).await;
    req.extensions_mut().insert(MaybeUser(user));
    next.run(req).await
}

fn current(req: &Request) -> Result<&CurrentUser, AppError> {
    req.extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::Unauthenticated("Authentication required".into()))
}

pub async fn authorize(allowed: &'static [Role], req: Request, next: Next) -> Result<Response, AppError> {
    let CurrentUser(user) = current(&req)?;
    if !allowed.contains(&user.role) {
        warn!(user_id = %user.id, role = user.role.as_str(), "role not allowed");
        return Err(AppError::Forbidden(format!(
            "Access denied. Required role: {}",
            allowed.iter().map(Role::as_str).collect::<Vec<_>>().join(" or ")
        )));
    }
    Ok(next.run(req).await)
}

pub async fn require_role(role: Role, req: Request, next: Next) -> Result<Response, AppError> {
    let CurrentUser(user) = current(&req)?;
    if user.role != role {
        warn!(user_id = %user.id, role = user.role.as_str(), "role mismatch");
        return Err(AppError::Forbidden(format!("Access denied. {} only", role.as_str())));
    }
    Ok(next.run(req).await)
}

pub async fn require_verified(req: Request, next: Next) -> Result<Response, AppError> {
    let CurrentUser(user) = current(&req)?;
    if !user.is_verified {
        return Err(AppError::Forbidden("Account verification required".into()));
    }
    Ok(next.run(req).await)
}
