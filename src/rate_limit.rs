//! Per-client token buckets in front of the whole API.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{config::RateLimitConfig, error::AppError};

const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u64, refill_per_sec: f64) -> Self {
        Self {
            capacity: capacity as f64,
            tokens: capacity as f64,
            refill_per_sec,
            last_refill: Instant::now(),
        }
    }

    pub fn try_acquire(&mut self) -> bool {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    fn is_full_at(&mut self, now: Instant) -> bool {
        self.refill(now);
        self.tokens >= self.capacity
    }
}

/// `max_requests` per client per window, refilled continuously.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
    capacity: u64,
    refill_per_sec: f64,
}

impl RateLimiter {
    pub fn new(cfg: &RateLimitConfig) -> Self {
        let window = Duration::from_secs(cfg.window_secs.max(1));
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            capacity: cfg.max_requests.max(1),
            refill_per_sec: cfg.max_requests.max(1) as f64 / window.as_secs_f64(),
        }
    }

    pub async fn check(&self, client: &str) -> bool {
        let mut buckets = self.buckets.lock().await;
        if buckets.len() > PRUNE_THRESHOLD {
            let now = Instant::now();
            buckets.retain(|_, b| !b.is_full_at(now));
            debug!(remaining = buckets.len(), "pruned idle rate limit buckets");
        }
        buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity, self.refill_per_sec))
            .try_acquire()
    }
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`, then the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(String::from)
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| "unknown".into())
}

pub async fn enforce(State(limiter): State<RateLimiter>, req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(req.headers(), peer);
    if !limiter.check(&client).await {
        warn!(%client, "rate limit exceeded");
        return AppError::TooManyRequests(
            "Too many requests from this IP, please try again later.".into(),
        )
        .into_response();
    }
    next.run(req).await
}
