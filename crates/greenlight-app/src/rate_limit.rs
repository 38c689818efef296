//! Process wide token bucket, shared by all clients.

use std::{sync::Mutex, time::Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::ApiError, state::AppState};

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    rps: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl TokenBucket {
    /// Bucket starts full, with `burst` tokens, and gains `rps` tokens per second
    pub fn new(rps: f64, burst: u32) -> Self {
        let burst = f64::from(burst);
        TokenBucket {
            rps: rps.max(0.0),
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                refilled: Instant::now(),
            }),
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.acquire_at(Instant::now())
    }

    fn acquire_at(&self, now: Instant) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        let elapsed = now.saturating_duration_since(bucket.refilled).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.burst);
        bucket.refilled = now.max(bucket.refilled);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(limiter) = state.limiter() {
        if !limiter.try_acquire() {
            return ApiError::RateLimitExceeded.into_response();
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{body::Body, middleware, routing::get, Router};
    use greenlight_dal::movie::MemoryMovieRepository;
    use http::StatusCode;
    use tower::ServiceExt as _;

    use super::*;
    use crate::state::{AppConfig, LimiterConfig};

    #[test]
    fn test_burst_then_refill() {
        let limiter = TokenBucket::new(2.0, 4);
        let start = Instant::now();
        for _ in 0..4 {
            assert!(limiter.acquire_at(start));
        }
        assert!(!limiter.acquire_at(start));

        // half a second gives one token at 2 rps
        let later = start + Duration::from_millis(500);
        assert!(limiter.acquire_at(later));
        assert!(!limiter.acquire_at(later));

        // never more than burst
        let much_later = later + Duration::from_secs(60);
        for _ in 0..4 {
            assert!(limiter.acquire_at(much_later));
        }
        assert!(!limiter.acquire_at(much_later));
    }

    #[test]
    fn test_zero_burst_rejects_all() {
        let limiter = TokenBucket::new(100.0, 0);
        assert!(!limiter.try_acquire());
    }

    fn router(limiter: Option<LimiterConfig>) -> Router {
        let state = AppState::new(
            AppConfig {
                environment: "testing".to_string(),
                limiter,
            },
            Arc::new(MemoryMovieRepository::new()),
        );
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
            .with_state(state)
    }

    async fn status(app: &Router) -> StatusCode {
        app.clone()
            .oneshot(http::Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_middleware_rejects_when_empty() {
        let app = router(Some(LimiterConfig {
            rps: 0.001,
            burst: 2,
        }));
        assert_eq!(status(&app).await, StatusCode::OK);
        assert_eq!(status(&app).await, StatusCode::OK);
        assert_eq!(status(&app).await, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_middleware_disabled() {
        let app = router(None);
        for _ in 0..10 {
            assert_eq!(status(&app).await, StatusCode::OK);
        }
    }
}
