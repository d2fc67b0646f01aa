use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserSummary};

const USER_COLUMNS: &str = r#"
    id, name, email, password_hash, phone, role, is_verified, is_active,
    address, business_info, preferences,
    verification_token, verification_token_expires,
    reset_password_token, reset_password_expires,
    login_attempts, lock_until, last_login_at, created_at, updated_at
"#;

/// Credential store. Emails are expected lowercased by the caller.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_phone(&self, phone: &str) -> anyhow::Result<Option<User>>;
    async fn find_summaries(&self, ids: &[Uuid]) -> anyhow::Result<Vec<UserSummary>>;
    /// Returns `None` when the email is already taken.
    /// `None` when the email or phone is already taken.
    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>>;
    /// Bumps the failed-login counter, locking the account once `max_attempts` is
    /// reached. An expired lock restarts the count.
    async fn record_failed_login(
        &self,
        id: Uuid,
        max_attempts: i32,
        lock_until: OffsetDateTime,
        now: OffsetDateTime,
    ) -> anyhow::Result<()>;
    async fn record_successful_login(&self, id: Uuid, now: OffsetDateTime) -> anyhow::Result<()>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()>;
    async fn set_verified(&self, id: Uuid, verified: bool) -> anyhow::Result<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.db)
                .await
                .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_phone(&self, phone: &str) -> anyhow::Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE phone = $1"))
                .bind(phone)
                .fetch_optional(&self.db)
                .await
                .context("find user by phone")?;
        Ok(user)
    }

    async fn find_summaries(&self, ids: &[Uuid]) -> anyhow::Result<Vec<UserSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email, phone, business_info
              FROM users
             WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("find user summaries")?;
        Ok(rows)
    }

    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, phone, role, address, business_info)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(user.role)
        .bind(Json(&user.address))
        .bind(user.business_info.as_ref().map(Json))
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(u) => Ok(Some(u)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(e).context("insert user"),
        }
    }

    async fn record_failed_login(
        &self,
        id: Uuid,
        max_attempts: i32,
        lock_until: OffsetDateTime,
        now: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET login_attempts = CASE
                       WHEN lock_until IS NOT NULL AND lock_until <= $4 THEN 1
                       ELSE login_attempts + 1
                   END,
                   lock_until = CASE
                       WHEN lock_until IS NOT NULL AND lock_until <= $4 THEN NULL
                       WHEN login_attempts + 1 >= $2 THEN $3
                       ELSE lock_until
                   END,
                   updated_at = $4
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .bind(lock_until)
        .bind(now)
        .execute(&self.db)
        .await
        .context("record failed login")?;
        Ok(())
    }

    async fn record_successful_login(&self, id: Uuid, now: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET login_attempts = 0, lock_until = NULL, last_login_at = $2, updated_at = $2
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.db)
        .await
        .context("record successful login")?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await
            .context("update password")?;
        Ok(())
    }

    async fn set_verified(&self, id: Uuid, verified: bool) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_verified = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(verified)
        .fetch_optional(&self.db)
        .await
        .context("set user verification")?;
        Ok(user)
    }
}
