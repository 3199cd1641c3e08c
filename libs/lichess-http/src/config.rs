use secrecy::SecretString;
use std::time::Duration;

/// Public lichess endpoint. Must end with `/` so relative paths resolve under it.
pub const DEFAULT_BASE_URL: &str = "https://lichess.org/";

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("lichess-http/", env!("CARGO_PKG_VERSION"));

/// Media type requested for single-document responses
pub const MEDIA_TYPE_JSON: &str = "application/json";

/// Media type requested for newline-delimited JSON streams
pub const MEDIA_TYPE_NDJSON: &str = "application/x-ndjson";

/// Token bucket parameters shared by every request of one executor.
///
/// One token is added every `interval`, up to `burst` tokens. Both values
/// must be non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Refill period for one token (default: 1 second)
    pub interval: Duration,

    /// Bucket capacity (default: 20)
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            burst: 20,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn new(interval: Duration, burst: u32) -> Self {
        Self { interval, burst }
    }

    /// Limits loose enough to never throttle a test run.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            interval: Duration::from_millis(1),
            burst: 1000,
        }
    }
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Use Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// Use OS native root certificate store
    Native,
}

/// Transport security configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Require TLS for all connections (HTTPS only)
    #[default]
    TlsOnly,
    /// Allow plain HTTP, for local mock servers only
    AllowInsecureHttp,
}

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is resolved against (default: `https://lichess.org/`)
    pub base_url: String,

    /// Personal API token sent as `Authorization: Bearer <token>` (default: none)
    pub api_token: Option<SecretString>,

    /// User-Agent header value
    pub user_agent: String,

    /// Per-request timeout covering dispatch until response headers (default: 10 seconds)
    pub request_timeout: Duration,

    /// TCP connect timeout (default: 5 seconds)
    pub connect_timeout: Duration,

    /// Maximum response body size in bytes (default: 64 MB)
    ///
    /// Game exports stream a whole history as NDJSON, hence the generous default.
    pub max_body_size: usize,

    /// Token bucket gating all outbound calls
    pub rate_limit: RateLimitConfig,

    /// Transport security mode (default: `TlsOnly`)
    pub transport: TransportSecurity,

    /// TLS root certificate strategy (default: `WebPki`)
    pub tls_roots: TlsRootConfig,

    /// Maximum number of requests queued for the transport worker (default: 1024)
    pub buffer_capacity: usize,

    /// Timeout for idle pooled connections (default: 90 seconds)
    pub pool_idle_timeout: Option<Duration>,

    /// Maximum number of idle connections per host (default: 32)
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_token: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            max_body_size: 64 * 1024 * 1024,
            rate_limit: RateLimitConfig::default(),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            buffer_capacity: 1024,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl ClientConfig {
    /// Configuration for tests against a local mock server.
    ///
    /// Allows plain HTTP and never throttles.
    #[must_use]
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(5),
            max_body_size: 1024 * 1024,
            rate_limit: RateLimitConfig::for_testing(),
            transport: TransportSecurity::AllowInsecureHttp,
            buffer_capacity: 64,
            pool_idle_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 4,
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();

        assert_eq!(config.base_url, "https://lichess.org/");
        assert!(config.api_token.is_none());
        assert_eq!(config.rate_limit.interval, Duration::from_secs(1));
        assert_eq!(config.rate_limit.burst, 20);
        assert_eq!(config.transport, TransportSecurity::TlsOnly);
        assert!(config.user_agent.starts_with("lichess-http/"));
    }

    #[test]
    fn test_for_testing_allows_http() {
        let config = ClientConfig::for_testing("http://127.0.0.1:8080/");

        assert_eq!(config.base_url, "http://127.0.0.1:8080/");
        assert_eq!(config.transport, TransportSecurity::AllowInsecureHttp);
        assert_eq!(config.rate_limit, RateLimitConfig::for_testing());
    }
}
