/// Rate limiting for the credential endpoints
///
/// Fixed-window counters keyed by client IP. Sign-up, sign-in and the
/// password-reset OTP check share one limiter.
///
/// # Storage
///
/// Counters live in process by default. With `REDIS_URL` set they live in
/// Redis under `ratelimit:auth:{ip}` (`INCR`, then `EXPIRE` on the first hit)
/// so several API instances share them. Redis failures let the request
/// through and log a warning.
///
/// # Headers
///
/// Passing responses carry:
/// - `RateLimit-Limit`: requests allowed per window
/// - `RateLimit-Remaining`: requests left in the current window
/// - `RateLimit-Reset`: seconds until the window resets
///
/// Rejected requests get 429 with `Retry-After`.
///
/// # Example
///
/// ```
/// use dsamate_api::middleware::rate_limit::RateLimiter;
/// use std::time::Duration;
///
/// # async fn example() {
/// let limiter = RateLimiter::in_memory(5, Duration::from_secs(900));
/// let decision = limiter.check("203.0.113.7").await;
/// assert!(decision.allowed);
/// assert_eq!(decision.remaining, 4);
/// # }
/// ```

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

const REDIS_KEY_PREFIX: &str = "ratelimit:auth:";

/// Entries kept in memory before expired windows are swept
const SWEEP_THRESHOLD: usize = 10_000;

/// Outcome of a limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the window resets
    pub reset_after: u64,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

enum Store {
    Memory(DashMap<String, Window>),
    Redis(ConnectionManager),
}

/// Fixed-window request limiter
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    store: Store,
}

impl RateLimiter {
    /// Limiter with counters in this process
    pub fn in_memory(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            store: Store::Memory(DashMap::new()),
        }
    }

    /// Limiter with counters in Redis
    pub async fn with_redis(
        redis_url: &str,
        max_requests: u32,
        window: Duration,
    ) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        Ok(Self {
            max_requests,
            window,
            store: Store::Redis(manager),
        })
    }

    pub fn backend(&self) -> &'static str {
        match self.store {
            Store::Memory(_) => "memory",
            Store::Redis(_) => "redis",
        }
    }

    /// Counts a request for `key` and decides whether it may proceed
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        match &self.store {
            Store::Memory(windows) => self.check_memory(windows, key, Instant::now()),
            Store::Redis(manager) => match self.check_redis(manager.clone(), key).await {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::warn!(error = %e, "Rate limit store unavailable, allowing request");
                    self.decision(0)
                }
            },
        }
    }

    fn check_memory(&self, windows: &DashMap<String, Window>, key: &str, now: Instant) -> RateLimitDecision {
        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let mut entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }
        entry.count = entry.count.saturating_add(1);

        let elapsed = now.duration_since(entry.started);
        let reset_after = self.window.saturating_sub(elapsed).as_secs().max(1);

        RateLimitDecision {
            reset_after,
            ..self.decision(entry.count)
        }
    }

    async fn check_redis(
        &self,
        mut conn: ConnectionManager,
        key: &str,
    ) -> Result<RateLimitDecision, redis::RedisError> {
        let key = format!("{REDIS_KEY_PREFIX}{key}");
        let window_secs = self.window.as_secs().max(1);

        let count: u32 = redis::cmd("INCR").arg(&key).query_async(&mut conn).await?;
        let mut ttl: i64 = redis::cmd("TTL").arg(&key).query_async(&mut conn).await?;
        if count == 1 || ttl < 0 {
            redis::cmd("EXPIRE")
                .arg(&key)
                .arg(window_secs)
                .query_async::<_, ()>(&mut conn)
                .await?;
            ttl = window_secs as i64;
        }

        Ok(RateLimitDecision {
            reset_after: ttl.max(1) as u64,
            ..self.decision(count)
        })
    }

    fn decision(&self, count: u32) -> RateLimitDecision {
        RateLimitDecision {
            allowed: count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(count),
            reset_after: self.window.as_secs(),
        }
    }
}

/// Client address: first `X-Forwarded-For` entry, `X-Real-IP`, the socket
/// address, or `unknown`
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return first.to_string();
        }
    }
    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }
    remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware layer
///
/// # Errors
///
/// - 429 Too Many Requests: limit exceeded for this client
pub async fn auth_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), remote);

    let decision = state.limiter.check(&ip).await;
    if !decision.allowed {
        tracing::warn!(client_ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        return ApiError::RateLimitExceeded {
            retry_after: decision.reset_after,
            message: "Too many requests, please try again later.".to_string(),
        }
        .into_response();
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("ratelimit-reset", HeaderValue::from(decision.reset_after));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_windows(limiter: &RateLimiter) -> &DashMap<String, Window> {
        match &limiter.store {
            Store::Memory(windows) => windows,
            Store::Redis(_) => unreachable!(),
        }
    }

    #[test]
    fn test_window_allows_up_to_limit() {
        let limiter = RateLimiter::in_memory(3, Duration::from_secs(60));
        let windows = memory_windows(&limiter);
        let now = Instant::now();

        let first = limiter.check_memory(windows, "ip", now);
        assert!(first.allowed);
        assert_eq!(first.remaining, 2);
        assert_eq!(first.limit, 3);

        assert!(limiter.check_memory(windows, "ip", now).allowed);
        let third = limiter.check_memory(windows, "ip", now);
        assert!(third.allowed);
        assert_eq!(third.remaining, 0);

        let fourth = limiter.check_memory(windows, "ip", now + Duration::from_secs(10));
        assert!(!fourth.allowed);
        assert_eq!(fourth.remaining, 0);
        assert_eq!(fourth.reset_after, 50);
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::in_memory(1, Duration::from_secs(60));
        let windows = memory_windows(&limiter);
        let now = Instant::now();

        assert!(limiter.check_memory(windows, "ip", now).allowed);
        assert!(!limiter.check_memory(windows, "ip", now).allowed);
        assert!(limiter
            .check_memory(windows, "ip", now + Duration::from_secs(60))
            .allowed);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::in_memory(1, Duration::from_secs(60));
        let windows = memory_windows(&limiter);
        let now = Instant::now();

        assert!(limiter.check_memory(windows, "a", now).allowed);
        assert!(limiter.check_memory(windows, "b", now).allowed);
        assert!(!limiter.check_memory(windows, "a", now).allowed);
    }

    #[tokio::test]
    async fn test_check_in_memory() {
        let limiter = RateLimiter::in_memory(2, Duration::from_secs(900));
        assert_eq!(limiter.backend(), "memory");
        assert!(limiter.check("x").await.allowed);
        assert!(limiter.check("x").await.allowed);
        assert!(!limiter.check("x").await.allowed);
    }

    #[test]
    fn test_client_ip_precedence() {
        let remote: SocketAddr = "10.0.0.9:5000".parse().unwrap();

        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, None), "unknown");
        assert_eq!(client_ip(&headers, Some(remote)), "10.0.0.9");

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers, Some(remote)), "198.51.100.2");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 70.41.3.18"),
        );
        assert_eq!(client_ip(&headers, Some(remote)), "203.0.113.7");
    }
}
