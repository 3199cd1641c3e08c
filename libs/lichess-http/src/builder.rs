use crate::config::{ClientConfig, RateLimitConfig, TlsRootConfig, TransportSecurity};
use crate::error::ClientError;
use crate::executor::{BufferedService, Executor};
use crate::layers::DefaultHeadersLayer;
use crate::limiter::RateGovernor;
use crate::request::validate_base_url;
use crate::response::ResponseBody;
use crate::tls;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tower::buffer::Buffer;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneService;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;

/// Type-erased transport the executor dispatches through.
///
/// The default is hyper over rustls; tests and embedders may supply their own
/// via [`ExecutorBuilder::with_transport`].
pub type TransportService = BoxCloneService<Request<Full<Bytes>>, Response<ResponseBody>, ClientError>;

/// Builder for an [`Executor`].
pub struct ExecutorBuilder {
    config: ClientConfig,
    transport: Option<TransportService>,
    governor: Option<Arc<RateGovernor>>,
}

impl ExecutorBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            governor: None,
        }
    }

    /// Base URL; must end with `/`
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Personal API token sent as a bearer credential
    #[must_use]
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = Some(SecretString::from(token.into()));
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.config.max_body_size = bytes;
        self
    }

    /// Token bucket: one token per `interval`, at most `burst` stored
    #[must_use]
    pub fn rate_limit(mut self, interval: Duration, burst: u32) -> Self {
        self.config.rate_limit = RateLimitConfig::new(interval, burst);
        self
    }

    /// Share an existing governor, e.g. between several executors talking to the same account.
    ///
    /// Overrides the configured `rate_limit`.
    #[must_use]
    pub fn governor(mut self, governor: Arc<RateGovernor>) -> Self {
        self.governor = Some(governor);
        self
    }

    #[must_use]
    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.config.tls_roots = roots;
        self
    }

    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Allow plain `http://` base URLs (mock servers only)
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    #[must_use]
    pub fn allow_insecure_http(mut self) -> Self {
        self.config.transport = TransportSecurity::AllowInsecureHttp;
        self
    }

    /// Dispatch through `transport` instead of the built-in hyper client.
    ///
    /// Default headers, the request timeout and the rate limiter still apply.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportService) -> Self {
        self.transport = Some(transport);
        self
    }

    /// # Errors
    ///
    /// - [`ClientError::InvalidUri`] / [`ClientError::InvalidScheme`] for a bad base URL
    /// - [`ClientError::InvalidRateLimit`] for a zero burst or interval
    /// - [`ClientError::InvalidHeaderValue`] for a user agent or token unusable in a header
    /// - [`ClientError::Tls`] when native roots are requested but unavailable
    pub fn build(self) -> Result<Executor, ClientError> {
        let config = self.config;

        if config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!(
                "insecure HTTP enabled (TransportSecurity::AllowInsecureHttp); \
                 use only for testing with mock servers"
            );
        }

        let base_url = validate_base_url(&config.base_url, config.transport)?;

        let governor = match self.governor {
            Some(governor) => governor,
            None => Arc::new(RateGovernor::new(config.rate_limit)?),
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => hyper_transport(&config)?,
        };

        let headers = DefaultHeadersLayer::try_new(&config.user_agent, config.api_token.as_ref())?;
        let timeout = config.request_timeout;

        // Timeout → DefaultHeaders → transport
        let service = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .layer(headers)
            .service(transport)
            .map_err(move |e: tower::BoxError| map_tower_error(e, timeout))
            .boxed_clone();

        let service: BufferedService = Buffer::new(service, config.buffer_capacity.max(1));

        tracing::debug!(
            base_url = %base_url,
            limits = ?governor.limits(),
            "lichess executor built"
        );

        Ok(Executor {
            service,
            base_url,
            governor,
            max_body_size: config.max_body_size,
        })
    }
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decompression → pooled hyper client → rustls connector
fn hyper_transport(config: &ClientConfig) -> Result<TransportService, ClientError> {
    let https = build_https_connector(config)?;

    let mut client = Client::builder(TokioExecutor::new());
    // pool_idle_timeout needs a timer to take effect
    client
        .pool_timer(TokioTimer::new())
        .pool_max_idle_per_host(config.pool_max_idle_per_host);
    if let Some(idle) = config.pool_idle_timeout {
        client.pool_idle_timeout(idle);
    }
    let client = client.build::<_, Full<Bytes>>(https);

    Ok(ServiceBuilder::new()
        .layer(DecompressionLayer::new())
        .service(client)
        .map_response(map_decompression_response)
        .map_err(ClientError::from)
        .boxed_clone())
}

fn map_tower_error(err: tower::BoxError, timeout: Duration) -> ClientError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return ClientError::Timeout(timeout);
    }
    match err.downcast::<ClientError>() {
        Ok(err) => *err,
        Err(other) => ClientError::Transport(other),
    }
}

fn map_decompression_response<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, body.map_err(Into::into).boxed())
}

/// HTTPS connector advertising h2 and http/1.1 over ALPN.
///
/// # Errors
///
/// Returns `ClientError::Tls` if the root store cannot be set up.
fn build_https_connector(config: &ClientConfig) -> Result<HttpsConnector<HttpConnector>, ClientError> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(config.connect_timeout));

    let builder = match config.tls_roots {
        TlsRootConfig::WebPki => hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(tls::crypto_provider())
            .map_err(|e| ClientError::Tls(Box::new(e)))?,
        TlsRootConfig::Native => {
            let tls_config = tls::native_roots_client_config().map_err(|e| ClientError::Tls(e.into()))?;
            hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(tls_config)
        }
    };

    let connector = if config.transport == TransportSecurity::AllowInsecureHttp {
        builder.https_or_http().enable_all_versions().wrap_connector(http)
    } else {
        builder.https_only().enable_all_versions().wrap_connector(http)
    };
    Ok(connector)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::InvalidUriKind;
    use crate::response::full_body;

    fn ok_transport() -> TransportService {
        BoxCloneService::new(tower::service_fn(|_req: Request<Full<Bytes>>| async {
            Ok::<_, ClientError>(Response::new(full_body("{}")))
        }))
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ExecutorBuilder::new();
        assert_eq!(builder.config.base_url, "https://lichess.org/");
        assert_eq!(builder.config.request_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_build_default_transport() {
        let executor = ExecutorBuilder::new().build().unwrap();
        assert_eq!(executor.base_url().as_str(), "https://lichess.org/");
        assert_eq!(executor.governor().limits(), RateLimitConfig::default());
    }

    #[tokio::test]
    async fn test_build_rejects_base_url_without_trailing_slash() {
        let err = ExecutorBuilder::new()
            .base_url("https://lichess.org/api")
            .with_transport(ok_transport())
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::InvalidUri {
                kind: InvalidUriKind::MissingTrailingSlash,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_build_rejects_http_when_tls_only() {
        let err = ExecutorBuilder::new()
            .base_url("http://localhost:9000/")
            .with_transport(ok_transport())
            .build()
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidScheme { .. }));
    }

    #[tokio::test]
    async fn test_build_rejects_zero_burst() {
        let err = ExecutorBuilder::new()
            .rate_limit(Duration::from_secs(1), 0)
            .with_transport(ok_transport())
            .build()
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidRateLimit(_)));
    }

    #[tokio::test]
    async fn test_shared_governor_is_used() {
        let governor = Arc::new(RateGovernor::new(RateLimitConfig::new(Duration::from_secs(2), 3)).unwrap());

        let executor = ExecutorBuilder::new()
            .governor(Arc::clone(&governor))
            .with_transport(ok_transport())
            .build()
            .unwrap();

        governor.set_limits(Duration::from_secs(5), 7).unwrap();
        assert_eq!(executor.governor().limits().burst, 7);
    }

    #[test]
    fn test_map_tower_error_elapsed_is_timeout() {
        let err: tower::BoxError = Box::new(tower::timeout::error::Elapsed::new());
        assert!(matches!(
            map_tower_error(err, Duration::from_secs(3)),
            ClientError::Timeout(d) if d == Duration::from_secs(3)
        ));
    }

    #[test]
    fn test_map_tower_error_keeps_client_error() {
        let err: tower::BoxError = Box::new(ClientError::ServiceClosed);
        assert!(matches!(
            map_tower_error(err, Duration::from_secs(1)),
            ClientError::ServiceClosed
        ));
    }

    #[test]
    fn test_map_tower_error_wraps_unknown() {
        let err: tower::BoxError = Box::new(std::io::Error::other("reset"));
        assert!(matches!(
            map_tower_error(err, Duration::from_secs(1)),
            ClientError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_native_roots_build_or_fail_cleanly() {
        let result = ExecutorBuilder::new().tls_roots(TlsRootConfig::Native).build();
        assert!(matches!(result, Ok(_) | Err(ClientError::Tls(_))));
    }
}
