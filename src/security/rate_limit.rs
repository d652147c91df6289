//! Per-client rate limiting middleware.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;

use crate::config::schema::RateLimitSettings;
use crate::http::error::ErrorBody;
use crate::observability::metrics;
use crate::security::forwarded::ProxyTrust;

/// Key used when the client address cannot be determined.
const UNKNOWN_CLIENT: &str = "unknown";

/// Idle buckets are swept once every this many checks.
const SWEEP_EVERY: u64 = 1024;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    /// Idle long enough to have refilled completely.
    fn is_full_after(&self, refill_time: Duration, now: Instant) -> bool {
        now.duration_since(self.last_update) >= refill_time
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter state: one bucket per client address.
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    requests_per_second: u32,
    burst_size: u32,
    trust: ProxyTrust,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings, trust: ProxyTrust) -> Self {
        Self {
            buckets: DashMap::new(),
            requests_per_second: settings.requests_per_second,
            burst_size: settings.burst_size,
            trust,
            checks: AtomicU64::new(0),
        }
    }

    /// Take one token for `key`; false once the bucket is empty.
    pub fn check(&self, key: &str) -> bool {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.evict_idle();
        }

        let burst = f64::from(self.burst_size);
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(burst));
        bucket.try_acquire(burst, f64::from(self.requests_per_second))
    }

    /// Drop buckets that have refilled to capacity.
    ///
    /// A full bucket behaves exactly like a fresh one, so forgetting it
    /// does not change any client's allowance.
    pub fn evict_idle(&self) {
        let refill_time = Duration::from_secs_f64(
            f64::from(self.burst_size) / f64::from(self.requests_per_second.max(1)),
        );
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| !bucket.is_full_after(refill_time, now));
        let evicted = before.saturating_sub(self.buckets.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.buckets.len(), "Evicted idle rate-limit buckets");
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Human-readable limit, e.g. `10 per 1 second`.
    pub fn describe(&self) -> String {
        format!("{} per 1 second", self.requests_per_second)
    }

    fn exceeded_response(&self) -> Response {
        let body = ErrorBody::new(format!("Rate limit exceeded: {}", self.describe()));
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        response
    }
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = limiter
        .trust
        .client_ip(&request)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    if limiter.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, limit = %limiter.describe(), "Rate limit exceeded");
        metrics::record_rate_limited();
        limiter.exceeded_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rps: u32, burst: u32) -> RateLimiter {
        RateLimiter::new(
            &RateLimitSettings {
                requests_per_second: rps,
                burst_size: burst,
            },
            ProxyTrust::default(),
        )
    }

    #[test]
    fn burst_then_reject() {
        let limiter = limiter(1, 3);
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
    }

    #[test]
    fn clients_are_independent() {
        let limiter = limiter(1, 1);
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn refills_over_time() {
        let limiter = limiter(50, 1);
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        std::thread::sleep(std::time::Duration::from_millis(60));
        assert!(limiter.check("10.0.0.1"));
    }

    #[test]
    fn idle_clients_are_forgotten() {
        let limiter = limiter(1000, 5);
        for i in 0..500 {
            assert!(limiter.check(&format!("10.1.{}.{}", i / 256, i % 256)));
        }
        assert_eq!(limiter.tracked_clients(), 500);

        std::thread::sleep(std::time::Duration::from_millis(20));
        limiter.evict_idle();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn draining_clients_are_kept() {
        let limiter = limiter(1, 2);
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        limiter.evict_idle();
        assert_eq!(limiter.tracked_clients(), 1);
        assert!(!limiter.check("10.0.0.1"));
    }

    #[test]
    fn sweep_runs_during_checks() {
        let limiter = limiter(1000, 1);
        for i in 0..SWEEP_EVERY - 1 {
            limiter.check(&format!("one-shot-{i}"));
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
        limiter.check("last");
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[tokio::test]
    async fn exceeded_response_is_structured() {
        let response = limiter(5, 1).exceeded_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Rate limit exceeded: 5 per 1 second");
    }
}
