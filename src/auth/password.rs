//! Argon2 hashing for account passwords.
//!
//! A wrong password is `Ok(false)` and counts toward the login lock. A stored
//! hash that does not parse is an error and surfaces as a 500.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

fn argon2_failure(op: &'static str, e: password_hash::Error) -> anyhow::Error {
    error!(error = %e, op, "argon2 failure");
    anyhow::anyhow!("argon2 {op}: {e}")
}

/// PHC string stored in `users.password_hash`; salted per call.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| argon2_failure("hash", e))
}

pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| argon2_failure("parse stored hash", e))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
