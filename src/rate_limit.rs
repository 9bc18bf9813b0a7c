/// Rate limiting for LLM-backed endpoints
///
/// One process-wide quota shared by every route that spends provider tokens.
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{OxbowError, OxbowResult},
};
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

const DEFAULT_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(30) {
    Some(n) => n,
    None => unreachable!(),
};

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    per_minute: NonZeroU32,
    generation: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let per_minute =
            NonZeroU32::new(config.generation_requests_per_minute).unwrap_or(DEFAULT_PER_MINUTE);

        Self {
            enabled: config.enabled,
            per_minute,
            generation: Arc::new(GovernorLimiter::direct(Quota::per_minute(per_minute))),
        }
    }

    /// Take one cell from the generation quota
    pub fn check_generation(&self) -> OxbowResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.generation.check().map_err(|not_until| {
            let retry_after = not_until.wait_time_from(DefaultClock::default().now());
            OxbowError::RateLimitExceeded {
                retry_after: retry_after.max(Duration::from_secs(1)),
            }
        })
    }

    pub fn limit(&self) -> u32 {
        self.per_minute.get()
    }
}

/// Rate limiting middleware for generation routes
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    match ctx.rate_limiter.check_generation() {
        Ok(()) => {
            let mut response = next.run(request).await;
            if let Ok(limit) = HeaderValue::from_str(&ctx.rate_limiter.limit().to_string()) {
                response.headers_mut().insert("X-RateLimit-Limit", limit);
            }
            response
        }
        Err(e) => {
            tracing::warn!(path = %request.uri().path(), "Generation rate limit exceeded");
            crate::metrics::record_error(e.error_type(), "rate_limit");

            let retry_after = match &e {
                OxbowError::RateLimitExceeded { retry_after } => retry_after.as_secs().max(1),
                _ => 1,
            };
            let mut response = e.into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, per_minute: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled,
            generation_requests_per_minute: per_minute,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(&config(true, 30));
        assert!(limiter.check_generation().is_ok());
        assert_eq!(limiter.limit(), 30);
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&config(true, 3));

        for _ in 0..3 {
            assert!(limiter.check_generation().is_ok());
        }

        match limiter.check_generation() {
            Err(OxbowError::RateLimitExceeded { retry_after }) => {
                assert!(retry_after >= Duration::from_secs(1));
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_never_limits() {
        let limiter = RateLimiter::new(&config(false, 1));
        for _ in 0..10 {
            assert!(limiter.check_generation().is_ok());
        }
    }

    #[test]
    fn test_zero_quota_falls_back_to_default() {
        let limiter = RateLimiter::new(&config(true, 0));
        assert_eq!(limiter.limit(), 30);
    }
}
