use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::ApiConfig;
use crate::error::ApiError;
use super::auth::AuthUser;

/// Result of charging one request against a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_after: Duration,
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, key: &str) -> RateLimitDecision;
}

pub type SharedRateLimiter = Arc<dyn RateLimiter>;

/// Build the limiter described by the API config
pub fn from_config(api: &ApiConfig) -> SharedRateLimiter {
    if api.enable_rate_limiting {
        Arc::new(FixedWindowLimiter::new(
            api.rate_limit_requests,
            Duration::from_secs(api.rate_limit_window_secs),
        ))
    } else {
        Arc::new(Unlimited)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// In-process fixed window counter per key
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: RwLock<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: RwLock::new(HashMap::new()),
        }
    }

    async fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut windows = self.windows.write().await;

        // Drop expired windows so idle callers don't accumulate
        if windows.len() > 10_000 {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }

        let reset_after = self.window.saturating_sub(now.duration_since(entry.started));
        if entry.count >= self.limit {
            return RateLimitDecision { allowed: false, remaining: 0, reset_after };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.limit - entry.count,
            reset_after,
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now()).await
    }
}

/// Limiter used when rate limiting is disabled
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn check(&self, _key: &str) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            remaining: u32::MAX,
            reset_after: Duration::ZERO,
        }
    }
}

/// Charges the authenticated caller; must run after jwt_auth_middleware
pub async fn rate_limit_middleware(
    State(limiter): State<SharedRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = request
        .extensions()
        .get::<AuthUser>()
        .map(AuthUser::rate_limit_key)
        .ok_or_else(|| ApiError::unauthorized("Authentication required before rate limiting"))?;

    let decision = limiter.check(&key).await;
    if !decision.allowed {
        tracing::warn!("Rate limit exceeded for {}", key);
        let mut response = ApiError::too_many_requests("Too many requests, please slow down").into_response();
        let retry_secs = decision.reset_after.as_secs().max(1);
        if let Ok(value) = HeaderValue::from_str(&retry_secs.to_string()) {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        return Ok(response);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_limit_within_window() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("t:u", now).await.allowed);
        let second = limiter.check_at("t:u", now).await;
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        assert!(!limiter.check_at("t:u", now).await.allowed);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("a", now).await.allowed);
        assert!(limiter.check_at("b", now).await.allowed);
        assert!(!limiter.check_at("a", now).await.allowed);
    }

    #[tokio::test]
    async fn window_resets() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(10));
        let now = Instant::now();
        assert!(limiter.check_at("a", now).await.allowed);
        assert!(!limiter.check_at("a", now + Duration::from_secs(5)).await.allowed);
        assert!(limiter.check_at("a", now + Duration::from_secs(10)).await.allowed);
    }

    #[tokio::test]
    async fn unlimited_always_allows() {
        for _ in 0..1000 {
            assert!(Unlimited.check("x").await.allowed);
        }
    }
}
