use crate::error::ClientError;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use std::convert::Infallible;
use std::time::{Duration, SystemTime};

/// Boxed response body produced by the transport.
///
/// Type-erased so the decompression layer and injected test transports share
/// one response type.
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// Transport-level response: status, headers and a not-yet-read body.
pub type RawResponse = http::Response<ResponseBody>;

/// Wrap in-memory bytes as a [`ResponseBody`].
///
/// Handy for custom transports built with `tower::service_fn`.
pub fn full_body(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into())
        .map_err(|never: Infallible| -> Box<dyn std::error::Error + Send + Sync> { match never {} })
        .boxed()
}

/// Metadata of a response that passed classification.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub method: Method,
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseMeta {
    /// `Content-Type` header value, if present and valid UTF-8.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Parse a `Retry-After` header as a relative wait.
///
/// Accepts delta-seconds (`120`) or an HTTP-date. Negative seconds and dates in
/// the past yield `None`.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = raw.parse::<i64>() {
        return u64::try_from(seconds).ok().map(Duration::from_secs);
    }

    let at = httpdate::parse_http_date(raw).ok()?;
    at.duration_since(SystemTime::now()).ok()
}

/// Collect a body into memory, failing once more than `limit` bytes arrive.
pub(crate) async fn read_body_limited(body: ResponseBody, limit: usize) -> Result<Bytes, ClientError> {
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(ClientError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            let actual = collected.len() + chunk.len();
            if actual > limit {
                return Err(ClientError::BodyTooLarge { limit, actual });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}
