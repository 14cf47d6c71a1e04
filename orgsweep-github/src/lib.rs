pub mod client;
pub mod error;
pub mod pagination;
pub mod result;

pub use client::{ApiContext, Credentials, GITHUB_API_BASE, GITHUB_V3_ACCEPT, read_rate_limit};
pub use error::ApiError;
pub use pagination::{PageLink, PageLinks, fetch_all_pages};
pub use result::{ApiResponse, RATE_LIMIT_SENTINEL, RateLimitState};
