use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use tracing::instrument;

use super::{
    dto::{
        AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, SendOtpRequest,
        UserEnvelope, VerifyOtpRequest,
    },
    extractors::CurrentUser,
    gate::authenticate,
    services,
};
use crate::{
    error::{ApiResponse, AppError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/otp/send", post(send_otp))
        .route("/auth/otp/verify", post(verify_otp))
}

pub fn me_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/password", put(change_password))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, CookieJar, ApiResponse<AuthResponse>), AppError> {
    let (token, user) = services::register(&state, payload).await?;
    let jar = jar.add(services::session_cookie(&state, token.clone()));
    Ok((
        StatusCode::CREATED,
        jar,
        ApiResponse::with_message("User registered successfully", AuthResponse { token, user }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, ApiResponse<AuthResponse>), AppError> {
    let (token, user) = services::login(&state, payload).await?;
    let jar = jar.add(services::session_cookie(&state, token.clone()));
    Ok((
        jar,
        ApiResponse::with_message("Login successful", AuthResponse { token, user }),
    ))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, ApiResponse<()>) {
    (
        jar.add(services::expired_cookie()),
        ApiResponse::message("Logged out successfully"),
    )
}

#[instrument(skip(user), fields(user_id = %user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> ApiResponse<UserEnvelope> {
    ApiResponse::data(UserEnvelope { user })
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(payload), _): WithRejection<Json<ChangePasswordRequest>, AppError>,
) -> Result<ApiResponse<()>, AppError> {
    services::change_password(&state, &user, payload).await?;
    Ok(ApiResponse::message("Password updated successfully"))
}

pub async fn send_otp(
    WithRejection(Json(payload), _): WithRejection<Json<SendOtpRequest>, AppError>,
) -> Result<ApiResponse<()>, AppError> {
    services::send_otp(&payload.phone)?;
    Ok(ApiResponse::message("OTP sent successfully"))
}

#[instrument(skip(state, jar, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<VerifyOtpRequest>, AppError>,
) -> Result<(CookieJar, ApiResponse<AuthResponse>), AppError> {
    let (token, user) = services::verify_otp(&state, payload).await?;
    let jar = jar.add(services::session_cookie(&state, token.clone()));
    Ok((
        jar,
        ApiResponse::with_message("OTP verified successfully", AuthResponse { token, user }),
    ))
}
