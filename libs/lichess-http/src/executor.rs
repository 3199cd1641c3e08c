use crate::builder::ExecutorBuilder;
use crate::classify::classify;
use crate::decode::{DecodeError, Destination, decode};
use crate::error::ClientError;
use crate::limiter::RateGovernor;
use crate::request::RequestDescriptor;
use crate::response::{RawResponse, ResponseBody, ResponseMeta, read_body_limited};
use bytes::{Buf, Bytes};
use http::{Request, Response};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::buffer::Buffer;
use tower::{Service, ServiceExt};
use url::Url;

/// Future type of the type-erased transport stack
pub(crate) type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<ResponseBody>, ClientError>> + Send>>;

/// Buffered transport shared by all clones of an [`Executor`]
pub(crate) type BufferedService = Buffer<Request<Full<Bytes>>, ServiceFuture>;

/// Rate-governed, cancellation-aware request executor.
///
/// Every call goes through the same sequence: wait for a rate token, dispatch,
/// classify the response, then decode the body into the caller's destination.
/// Clones share the transport and the token bucket.
#[derive(Clone)]
pub struct Executor {
    pub(crate) service: BufferedService,
    pub(crate) base_url: Url,
    pub(crate) governor: Arc<RateGovernor>,
    pub(crate) max_body_size: usize,
}

impl Executor {
    /// Builder with default configuration. `build()` must run inside a Tokio runtime.
    #[must_use]
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    /// Replace the token bucket for all subsequent calls on every clone.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRateLimit`] if `burst` or `interval` is zero.
    pub fn set_limits(&self, interval: Duration, burst: u32) -> Result<(), ClientError> {
        self.governor.set_limits(interval, burst)
    }

    /// Execute `request` and decode the response body into `destination`.
    ///
    /// The destination's [`Shape`](crate::Shape) picks both the `Accept`
    /// header and the decoding mode. On a decode failure the destination keeps
    /// whatever was decoded before the bad value.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Canceled`] if `cancel` fires while waiting for a rate
    ///   token or while the request is in flight
    /// - [`ClientError::RateLimited`] / [`ClientError::Status`] for non-2xx responses
    /// - [`ClientError::Decode`] if the body is not valid JSON / NDJSON for the destination
    /// - transport, timeout and request-building errors
    pub async fn execute<D>(
        &self,
        cancel: &CancellationToken,
        request: RequestDescriptor,
        destination: &mut D,
    ) -> Result<ResponseMeta, ClientError>
    where
        D: Destination + ?Sized,
    {
        let (meta, body) = self.send(cancel, request, D::SHAPE).await?;

        match decode(body.reader(), destination) {
            Ok(count) => {
                tracing::trace!(url = %meta.url, count, "decoded response values");
                Ok(meta)
            }
            Err(source) => {
                tracing::debug!(url = %meta.url, error = %source, "response body did not decode");
                Err(ClientError::Decode {
                    source,
                    response: Box::new(meta),
                })
            }
        }
    }

    /// Execute `request` expecting exactly one JSON document.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::execute`], plus [`DecodeError::MissingValue`] when
    /// the body is empty.
    pub async fn fetch_one<T>(
        &self,
        cancel: &CancellationToken,
        request: RequestDescriptor,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let mut slot: Option<T> = None;
        let meta = self.execute(cancel, request, &mut slot).await?;
        slot.ok_or_else(|| ClientError::Decode {
            source: DecodeError::MissingValue,
            response: Box::new(meta),
        })
    }

    /// Execute `request` and collect an NDJSON response.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::execute`]; decoded elements are discarded on failure.
    pub async fn fetch_all<T>(
        &self,
        cancel: &CancellationToken,
        request: RequestDescriptor,
    ) -> Result<Vec<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        let mut items = Vec::new();
        self.execute(cancel, request, &mut items).await?;
        Ok(items)
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        request: RequestDescriptor,
        shape: crate::decode::Shape,
    ) -> Result<(ResponseMeta, Bytes), ClientError> {
        let request = request.into_http(&self.base_url, shape)?;
        let method = request.method().clone();
        let url = request.uri().to_string();

        self.governor.acquire(cancel).await?;
        tracing::debug!(%method, %url, "dispatching request");

        let response = self.dispatch(cancel, request).await?;
        let response = classify(&method, &url, response, self.max_body_size).await?;

        let (parts, body) = response.into_parts();
        let body = read_body_limited(body, self.max_body_size).await?;

        Ok((
            ResponseMeta {
                method,
                url,
                status: parts.status,
                headers: parts.headers,
            },
            body,
        ))
    }

    /// Send through the buffered transport, abandoning the call if `cancel` fires.
    ///
    /// A transport failure observed after cancellation is reported as
    /// [`ClientError::Canceled`].
    async fn dispatch(
        &self,
        cancel: &CancellationToken,
        request: Request<Full<Bytes>>,
    ) -> Result<RawResponse, ClientError> {
        let mut service = self.service.clone();
        let call = async move {
            let ready = service.ready().await.map_err(map_buffer_error)?;
            ready.call(request).await.map_err(map_buffer_error)
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("request cancelled in flight");
                Err(ClientError::Canceled)
            }
            result = call => match result {
                Err(_) if cancel.is_cancelled() => Err(ClientError::Canceled),
                other => other,
            },
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("base_url", &self.base_url.as_str())
            .field("governor", &self.governor)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

/// Unwrap a `ClientError` from the buffer, or report the worker as gone.
fn map_buffer_error(err: tower::BoxError) -> ClientError {
    match err.downcast::<ClientError>() {
        Ok(err) => *err,
        Err(err) => {
            tracing::error!(error = %err, "buffer worker closed unexpectedly; service unavailable");
            ClientError::ServiceClosed
        }
    }
}
