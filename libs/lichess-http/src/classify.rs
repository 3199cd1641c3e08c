use crate::error::{ClientError, StatusError};
use crate::response::{RawResponse, parse_retry_after, read_body_limited};
use bytes::Bytes;
use http::{Method, StatusCode};
use serde::Deserialize;

/// Shape of lichess error payloads. Both fields show up in the wild.
#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn extract_message(body: &Bytes) -> String {
    serde_json::from_slice::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.message.or(payload.error))
        .unwrap_or_default()
}

/// Sort a response into success or a typed error.
///
/// A 2xx response is returned untouched with its body unread. Anything else
/// has its body read in full (up to `max_body_size`) and becomes
/// [`ClientError::RateLimited`] for 429 or [`ClientError::Status`] otherwise.
/// Body read failures never mask the status: the error is still produced,
/// with an empty body and message.
///
/// # Errors
///
/// Every non-2xx status is an error.
pub async fn classify(
    method: &Method,
    url: &str,
    response: RawResponse,
    max_body_size: usize,
) -> Result<RawResponse, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let body = match read_body_limited(body, max_body_size).await {
        Ok(body) => body,
        Err(err) => {
            tracing::debug!(%status, error = %err, "could not read error response body");
            Bytes::new()
        }
    };

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS;
    let error = Box::new(StatusError {
        method: method.clone(),
        url: url.to_owned(),
        status,
        message: extract_message(&body),
        retry_after: if rate_limited {
            parse_retry_after(&parts.headers)
        } else {
            None
        },
        headers: parts.headers,
        body,
    });

    if rate_limited {
        tracing::warn!(
            url,
            retry_after = ?error.retry_after,
            "lichess rate limit hit"
        );
        Err(ClientError::RateLimited(error))
    } else {
        tracing::debug!(%method, url, %status, message = %error.message, "request failed");
        Err(ClientError::Status(error))
    }
}
