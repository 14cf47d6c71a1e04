use crate::error::{ApiError, Result};
use crate::result::{ApiResponse, RateLimitState};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const GITHUB_V3_ACCEPT: &str = "application/vnd.github.v3+json";

/// Basic-auth credentials: a GitHub username and personal access token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.token.is_empty()
    }
}

/// State shared by every API call of one run.
///
/// Owns the pooled HTTP session and the rate-limit headroom reported by the
/// most recent response. Build one per run and pass it down by reference.
pub struct ApiContext {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    rate_limit: RateLimitState,
    verbose: bool,
}

impl ApiContext {
    pub fn new(credentials: Option<Credentials>) -> Result<Self> {
        Self::with_timeout(credentials, 30)
    }

    pub fn with_timeout(credentials: Option<Credentials>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                "orgsweep/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/trapdoorsec/orgsweep)"
            ))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: GITHUB_API_BASE.to_string(),
            credentials: credentials.filter(|c| !c.is_empty()),
            rate_limit: RateLimitState::Unobserved,
            verbose: false,
        })
    }

    /// Reuse an existing session instead of the one built by the constructor.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Resolve `/`-relative endpoints against `base` instead of api.github.com.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        Url::parse(base).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base, e)))?;
        self.base_url = base.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn rate_limit(&self) -> RateLimitState {
        self.rate_limit
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Turn an endpoint into an absolute URL.
    ///
    /// Paths starting with `/` are appended to the base URL; anything else must
    /// already be an absolute URL.
    pub fn resolve(&self, endpoint: &str) -> Result<String> {
        if endpoint.starts_with('/') {
            return Ok(format!("{}{}", self.base_url, endpoint));
        }

        Url::parse(endpoint)
            .map(|url| url.to_string())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", endpoint, e)))
    }

    /// Perform one authenticated GET.
    ///
    /// `auth` overrides the context credentials for this call; `headers` are
    /// merged over the default v3 `Accept` header. A missing endpoint is a
    /// caller mistake: it is logged and answered with `Ok(None)` so the caller
    /// can move on. The response is returned whatever its status.
    pub async fn get(
        &mut self,
        endpoint: Option<&str>,
        auth: Option<&Credentials>,
        headers: Option<&HeaderMap>,
    ) -> Result<Option<ApiResponse>> {
        let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) else {
            error!("GitHub API called with no endpoint");
            return Ok(None);
        };

        debug!("GitHub API called: {}", endpoint);
        let url = self.resolve(endpoint)?;

        let mut merged = HeaderMap::new();
        merged.insert(ACCEPT, HeaderValue::from_static(GITHUB_V3_ACCEPT));
        if let Some(extra) = headers {
            for (name, value) in extra.iter() {
                merged.insert(name.clone(), value.clone());
            }
        }

        let credentials = auth
            .filter(|c| !c.is_empty())
            .or(self.credentials.as_ref());

        let mut request = self.client.get(&url).headers(merged);
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.token));
        }

        let response = request.send().await?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response.text().await?;

        self.rate_limit = read_rate_limit(&response_headers);

        if self.verbose {
            info!("Endpoint: {}", url);
            let user = credentials
                .map(|c| c.username.as_str())
                .unwrap_or("(non-authenticated)");
            info!(
                "Rate Limit: {} available, {} used, {} total for {}",
                self.rate_limit.remaining(),
                self.rate_limit
                    .used()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                self.rate_limit.limit(),
                user
            );
        }

        Ok(Some(ApiResponse {
            url,
            status,
            headers: response_headers,
            body,
        }))
    }
}

/// Read rate-limit headroom from response headers.
///
/// Both headers must be present and numeric; otherwise the state is
/// `Unavailable` rather than an error.
pub fn read_rate_limit(headers: &HeaderMap) -> RateLimitState {
    let limit = header_u64(headers, "x-ratelimit-limit");
    let remaining = header_u64(headers, "x-ratelimit-remaining");

    match (limit, remaining) {
        (Some(limit), Some(remaining)) => RateLimitState::Known { limit, remaining },
        _ => RateLimitState::Unavailable,
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
