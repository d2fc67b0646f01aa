use axum::extract::FromRef;
use axum_extra::extract::cookie::{Cookie, SameSite};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, warn};

use super::{
    dto::{ChangePasswordRequest, LoginRequest, RegisterRequest, VerifyOtpRequest},
    extractors::TOKEN_COOKIE,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
};
use crate::{
    error::{AppError, FieldError},
    state::AppState,
    users::repo_types::{NewUser, PublicUser, Role},
};

/// OTP accepted by the mock SMS flow.
pub const MOCK_OTP: &str = "123456";
pub const MAX_LOGIN_ATTEMPTS: i32 = 5;
pub const LOCK_DURATION: TimeDuration = TimeDuration::hours(2);
const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{10,15}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

/// Session cookie mirroring the bearer token for browser clients.
pub fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(TOKEN_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(!state.config.is_development());
    cookie.set_max_age(time::Duration::minutes(state.config.jwt.ttl_minutes));
    cookie
}

pub fn expired_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(TOKEN_COOKIE);
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

fn issue_token(state: &AppState, user: &PublicUser) -> Result<String, AppError> {
    let token = JwtKeys::from_ref(state).sign(user.id, user.role)?;
    Ok(token)
}

fn validate_registration(req: &mut RegisterRequest) -> Result<Role, AppError> {
    req.name = req.name.trim().to_string();
    req.email = req.email.trim().to_lowercase();
    req.phone = req
        .phone
        .take()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    let mut errors = Vec::new();
    let name_len = req.name.chars().count();
    if !(2..=50).contains(&name_len) {
        errors.push(FieldError::new("name", "Name must be between 2 and 50 characters"));
    }
    if !is_valid_email(&req.email) {
        errors.push(FieldError::new("email", "Please provide a valid email"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if let Some(phone) = &req.phone {
        if !is_valid_phone(phone) {
            errors.push(FieldError::new("phone", "Please provide a valid phone number"));
        }
    }
    let role = match req.role.as_deref().map(str::trim) {
        None | Some("") | Some("customer") => Some(Role::Customer),
        Some("service_provider") => Some(Role::ServiceProvider),
        Some(_) => {
            errors.push(FieldError::new("role", "Role must be customer or service_provider"));
            None
        }
    };

    match role {
        Some(role) if errors.is_empty() => Ok(role),
        _ => Err(AppError::Validation(errors)),
    }
}

pub async fn register(state: &AppState, mut req: RegisterRequest) -> Result<(String, PublicUser), AppError> {
    let role = validate_registration(&mut req)?;

    if state.users.find_by_email(&req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::Conflict("User already exists with this email".into()));
    }
    if let Some(phone) = &req.phone {
        if state.users.find_by_phone(phone).await?.is_some() {
            warn!(phone = %phone, "phone already registered");
            return Err(AppError::Conflict("User already exists with this phone number".into()));
        }
    }

    let password_hash = hash_password(&req.password)?;
    let new_user = NewUser {
        name: req.name,
        email: req.email,
        password_hash,
        phone: req.phone,
        role,
        address: req.address,
        business_info: if role == Role::ServiceProvider {
            req.business_info
        } else {
            None
        },
    };

    let user: PublicUser = state
        .users
        .create(new_user)
        .await?
        .ok_or_else(|| AppError::Conflict("User already exists".into()))?
        .into();

    let token = issue_token(state, &user)?;
    info!(user_id = %user.id, role = user.role.as_str(), "user registered");
    Ok((token, user))
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<(String, PublicUser), AppError> {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) || req.password.is_empty() {
        return Err(AppError::Validation(vec![FieldError::new(
            "email",
            "Email and password are required",
        )]));
    }

    let invalid = || AppError::Unauthenticated("Invalid credentials".into());
    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };

    let now = OffsetDateTime::now_utc();
    if user.is_locked(now) {
        warn!(user_id = %user.id, "login on locked account");
        return Err(AppError::Locked(
            "Account temporarily locked due to too many failed login attempts".into(),
        ));
    }

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        state
            .users
            .record_failed_login(user.id, MAX_LOGIN_ATTEMPTS, now + LOCK_DURATION, now)
            .await?;
        return Err(invalid());
    }

    if !user.is_active {
        return Err(AppError::Unauthenticated("Account is deactivated".into()));
    }

    state.users.record_successful_login(user.id, now).await?;
    let mut public: PublicUser = user.into();
    public.last_login_at = Some(now);
    let token = issue_token(state, &public)?;
    info!(user_id = %public.id, "user logged in");
    Ok((token, public))
}

pub async fn change_password(
    state: &AppState,
    identity: &PublicUser,
    req: ChangePasswordRequest,
) -> Result<(), AppError> {
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(vec![FieldError::new(
            "newPassword",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        )]));
    }
    let user = state
        .users
        .find_by_id(identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }
    let hash = hash_password(&req.new_password)?;
    state.users.update_password(user.id, &hash).await?;
    info!(user_id = %user.id, "password changed");
    Ok(())
}

/// Mock OTP dispatch: nothing is sent, the fixed code is logged.
pub fn send_otp(phone: &str) -> Result<(), AppError> {
    let phone = phone.trim();
    if !is_valid_phone(phone) {
        return Err(AppError::Validation(vec![FieldError::new(
            "phone",
            "Please provide a valid phone number",
        )]));
    }
    info!(phone = %phone, otp = MOCK_OTP, "mock otp issued");
    Ok(())
}

pub async fn verify_otp(state: &AppState, req: VerifyOtpRequest) -> Result<(String, PublicUser), AppError> {
    if req.otp.trim() != MOCK_OTP {
        return Err(AppError::BadRequest("Invalid OTP".into()));
    }
    let user = state
        .users
        .find_by_phone(req.phone.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("No account registered with this phone".into()))?;
    if !user.is_active {
        return Err(AppError::Unauthenticated("Account is deactivated".into()));
    }
    let now = OffsetDateTime::now_utc();
    state.users.record_successful_login(user.id, now).await?;
    let public: PublicUser = user.into();
    let token = issue_token(state, &public)?;
    Ok((token, public))
}
