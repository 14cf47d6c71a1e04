use reqwest::StatusCode;
use reqwest::header::HeaderMap;

/// Stand-in for limit and remaining when GitHub omits the rate-limit headers.
pub const RATE_LIMIT_SENTINEL: u64 = 999_999;

/// Rate-limit headroom as last reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitState {
    /// No API call has been made yet.
    #[default]
    Unobserved,
    /// Values taken from `X-RateLimit-Limit` / `X-RateLimit-Remaining`.
    Known { limit: u64, remaining: u64 },
    /// The last response did not carry the rate-limit headers.
    Unavailable,
}

impl RateLimitState {
    pub fn limit(&self) -> u64 {
        match self {
            RateLimitState::Known { limit, .. } => *limit,
            RateLimitState::Unavailable => RATE_LIMIT_SENTINEL,
            RateLimitState::Unobserved => 0,
        }
    }

    pub fn remaining(&self) -> u64 {
        match self {
            RateLimitState::Known { remaining, .. } => *remaining,
            RateLimitState::Unavailable => RATE_LIMIT_SENTINEL,
            RateLimitState::Unobserved => 0,
        }
    }

    /// Requests consumed in the current window, when known.
    pub fn used(&self) -> Option<u64> {
        match self {
            RateLimitState::Known { limit, remaining } => Some(limit.saturating_sub(*remaining)),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, RateLimitState::Known { .. })
    }
}

/// A fully read response from one API call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
