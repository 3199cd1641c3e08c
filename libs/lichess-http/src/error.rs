use crate::decode::DecodeError;
use crate::response::ResponseMeta;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification of URL validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
    /// URL is missing required scheme (http/https)
    MissingScheme,
    /// Base URL path does not end with `/`, so relative paths would drop its last segment
    MissingTrailingSlash,
}

/// Non-2xx response as seen by the classifier.
///
/// The classifier reads the whole error body before building this value, so
/// the original payload stays inspectable through [`StatusError::body`].
#[derive(Debug, Clone)]
pub struct StatusError {
    /// Request method
    pub method: Method,
    /// Fully resolved request URL
    pub url: String,
    /// Response status
    pub status: StatusCode,
    /// Best-effort `message` (or `error`) field from a JSON body; empty otherwise
    pub message: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw response body
    pub body: Bytes,
    /// Informational rate hint, parsed from `Retry-After` on 429 responses
    pub retry_after: Option<Duration>,
}

impl StatusError {
    /// Response body decoded as UTF-8 (lossy).
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} {}",
            self.method,
            self.url,
            self.status.as_u16(),
            self.message
        )?;
        if let Some(wait) = self.retry_after {
            write!(f, " (retry after {}s)", wait.as_secs())?;
        }
        Ok(())
    }
}

/// Errors produced by the executor, classifier and pager.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// The call's cancellation token fired before the call completed
    #[error("request canceled")]
    Canceled,

    /// Transport error (network, connection, etc)
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// TLS error
    #[error("tls error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Single request attempt timed out
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx, non-429 response
    #[error("{0}")]
    Status(Box<StatusError>),

    /// HTTP 429 Too Many Requests
    #[error("rate limited: {0}")]
    RateLimited(Box<StatusError>),

    /// Response was classified as successful but its payload did not decode.
    ///
    /// Any values decoded before the failure remain in the destination.
    #[error("{} {}: failed to decode response body: {source}", .response.method, .response.url)]
    Decode {
        #[source]
        source: DecodeError,
        response: Box<ResponseMeta>,
    },

    /// Response body exceeded size limit
    #[error("response body too large: limit {limit} bytes, got {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Request building failed
    #[error("failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Invalid header value
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// JSON request body could not be encoded
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Query string could not be encoded
    #[error("query encoding failed: {0}")]
    QueryEncode(#[from] serde_urlencoded::ser::Error),

    /// Invalid URL
    ///
    /// Use the `kind` field for programmatic matching; `reason` is for logging only.
    #[error("invalid url '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    /// Invalid URL scheme for transport security configuration
    #[error("url scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme { scheme: String, reason: String },

    /// Rejected limiter settings (zero burst or zero interval)
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Transport worker shut down (buffer closed)
    #[error("service unavailable: transport worker closed")]
    ServiceClosed,
}

impl ClientError {
    /// True for HTTP 429 responses; callers may back off and retry at a higher layer.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Classified non-2xx response, if this error carries one.
    #[must_use]
    pub fn status_error(&self) -> Option<&StatusError> {
        match self {
            Self::Status(err) | Self::RateLimited(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status of the response that caused this error, when one was received.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(err) | Self::RateLimited(err) => Some(err.status),
            Self::Decode { response, .. } => Some(response.status),
            _ => None,
        }
    }

    /// Rate hint attached to a rate-limit error.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited(err) => err.retry_after,
            _ => None,
        }
    }
}

impl From<hyper::Error> for ClientError {
    fn from(err: hyper::Error) -> Self {
        ClientError::Transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for ClientError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        ClientError::Transport(Box::new(err))
    }
}
