use std::net::SocketAddr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => anyhow::bail!("unknown APP_ENV {other:?}"),
        }
    }
}

/// Requests allowed per client within a sliding window.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin; `None` means permissive.
    pub client_url: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub body_limit_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "marketplace".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "marketplace-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60 * 24 * 7),
        };
        let environment = match std::env::var("APP_ENV") {
            Ok(raw) => Environment::parse(&raw)?,
            Err(_) => Environment::Development,
        };
        let client_url = std::env::var("CLIENT_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url,
            jwt,
            environment,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").unwrap_or(8080),
            client_url,
            rate_limit: RateLimitConfig {
                max_requests: env_parse("RATE_LIMIT_MAX").unwrap_or(100),
                window_secs: env_parse("RATE_LIMIT_WINDOW_SECS").unwrap_or(15 * 60),
            },
            body_limit_bytes: env_parse("BODY_LIMIT_BYTES").unwrap_or(10 * 1024 * 1024),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
