use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    ServiceProvider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::ServiceProvider => "service_provider",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessInfo {
    pub business_name: Option<String>,
    pub description: Option<String>,
    pub years_of_experience: Option<u32>,
    pub license_number: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub language: String,
    pub currency: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            email_notifications: true,
            sms_notifications: true,
            language: "en".into(),
            currency: "INR".into(),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub is_active: bool,
    pub address: Json<Address>,
    pub business_info: Option<Json<BusinessInfo>>,
    pub preferences: Json<Preferences>,
    pub verification_token: Option<String>,
    pub verification_token_expires: Option<OffsetDateTime>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<OffsetDateTime>,
    pub login_attempts: i32,
    pub lock_until: Option<OffsetDateTime>,
    pub last_login_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn is_locked(&self, now: OffsetDateTime) -> bool {
        self.lock_until.is_some_and(|until| until > now)
    }
}

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
    pub address: Address,
    pub business_info: Option<BusinessInfo>,
}

/// The user as seen by clients and by request handlers: no secrets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub is_active: bool,
    pub address: Address,
    pub business_info: Option<BusinessInfo>,
    pub preferences: Preferences,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            role: u.role,
            is_verified: u.is_verified,
            is_active: u.is_active,
            address: u.address.0,
            business_info: u.business_info.map(|b| b.0),
            preferences: u.preferences.0,
            last_login_at: u.last_login_at,
            created_at: u.created_at,
        }
    }
}

/// Display card embedded into listings (provider, verifier).
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_info: Option<Json<BusinessInfo>>,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            business_info: u.business_info.clone(),
        }
    }
}
