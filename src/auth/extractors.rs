use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use super::jwt::JwtKeys;
use crate::{error::AppError, state::AppState, users::repo_types::PublicUser};

/// Cookie carrying the session token for browser clients.
pub const TOKEN_COOKIE: &str = "token";

/// Bearer token from the `Authorization` header, falling back to the token cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Verifies the request token and loads the still-active user it names.
pub async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Result<PublicUser, AppError> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Unauthenticated("Access denied. No token provided".into()))?;

    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(&token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthenticated("Invalid or expired token".into())
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User no longer exists".into()))?;

    if !user.is_active {
        warn!(user_id = %user.id, "token for deactivated account");
        return Err(AppError::Unauthenticated("Account is deactivated".into()));
    }

    Ok(user.into())
}

/// Authenticated caller. Reuses the identity attached by the `authenticate`
/// middleware when present.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(current.clone());
        }
        let user = resolve_identity(state, &parts.headers).await?;
        parts.extensions.insert(CurrentUser(user.clone()));
        Ok(CurrentUser(user))
    }
}

/// Caller identity when a valid token is present; anonymous otherwise.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<PublicUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(maybe) = parts.extensions.get::<MaybeUser>() {
            return Ok(maybe.clone());
        }
        if let Some(CurrentUser(user)) = parts.extensions.get::<CurrentUser>() {
            return Ok(MaybeUser(Some(user.clone())));
        }
        Ok(MaybeUser(resolve_optional(state, &parts.headers).await))
    }
}

pub(crate) async fn resolve_optional(state: &AppState, headers: &HeaderMap) -> Option<PublicUser> {
    extract_token(headers)?;
    match resolve_identity(state, headers).await {
        Ok(user) => Some(user),
        Err(e) => {
            debug!(error = %e, "optional auth ignored");
            None
        }
    }
}
