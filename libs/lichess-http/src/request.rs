use crate::config::{MEDIA_TYPE_JSON, MEDIA_TYPE_NDJSON, TransportSecurity};
use crate::decode::Shape;
use crate::error::{ClientError, InvalidUriKind};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use http::{Method, Request};
use http_body_util::Full;
use serde::Serialize;
use url::Url;

/// One API call: method, path relative to the base URL, query and optional JSON body.
///
/// Built by endpoint code and consumed once by the executor.
#[derive(Debug, Clone)]
#[must_use = "a request descriptor does nothing until it is executed"]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    query: Option<String>,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Option<Bytes>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Encode `params` as the query string, replacing any previous one.
    ///
    /// `None` fields are skipped when the type uses `skip_serializing_if`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::QueryEncode`] if `params` is not a flat map.
    pub fn query<T: Serialize + ?Sized>(mut self, params: &T) -> Result<Self, ClientError> {
        let encoded = serde_urlencoded::to_string(params)?;
        self.query = (!encoded.is_empty()).then_some(encoded);
        Ok(self)
    }

    /// Serialize `body` as the JSON request payload.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Json`] if serialization fails.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    /// Add a header. Explicit headers win over the ones the executor derives.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHeaderValue`] if `value` is not a valid header value.
    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, ClientError> {
        self.headers.push((name, HeaderValue::from_str(value)?));
        Ok(self)
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Resolve against `base` and build the outgoing request.
    ///
    /// `Accept` follows the destination shape unless set explicitly. A body
    /// gets `Content-Type: application/json` unless set explicitly.
    pub(crate) fn into_http(
        self,
        base: &Url,
        shape: Shape,
    ) -> Result<Request<Full<Bytes>>, ClientError> {
        let url = resolve(base, &self.path, self.query.as_deref())?;

        let mut builder = Request::builder().method(self.method).uri(url.as_str());
        let headers = builder
            .headers_mut()
            .ok_or_else(|| ClientError::InvalidUri {
                url: url.to_string(),
                kind: InvalidUriKind::ParseError,
                reason: "request builder rejected the URL".to_owned(),
            })?;

        for (name, value) in self.headers {
            headers.insert(name, value);
        }
        if !headers.contains_key(ACCEPT) {
            let accept = match shape {
                Shape::Single => MEDIA_TYPE_JSON,
                Shape::Stream => MEDIA_TYPE_NDJSON,
            };
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
        }
        if self.body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE_JSON));
        }

        Ok(builder.body(Full::new(self.body.unwrap_or_default()))?)
    }
}

/// Parse and check a base URL: scheme allowed by `transport`, host present,
/// path ending with `/`.
pub(crate) fn validate_base_url(raw: &str, transport: TransportSecurity) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::InvalidUri {
        url: raw.to_owned(),
        kind: match e {
            url::ParseError::RelativeUrlWithoutBase => InvalidUriKind::MissingScheme,
            url::ParseError::EmptyHost => InvalidUriKind::MissingAuthority,
            _ => InvalidUriKind::ParseError,
        },
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "https" => {}
        "http" if transport == TransportSecurity::AllowInsecureHttp => {}
        "http" => {
            return Err(ClientError::InvalidScheme {
                scheme: "http".to_owned(),
                reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
            });
        }
        scheme => {
            return Err(ClientError::InvalidScheme {
                scheme: scheme.to_owned(),
                reason: "only http:// and https:// schemes are supported".to_owned(),
            });
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ClientError::InvalidUri {
            url: raw.to_owned(),
            kind: InvalidUriKind::MissingAuthority,
            reason: "missing host/authority".to_owned(),
        });
    }

    if !url.path().ends_with('/') {
        return Err(ClientError::InvalidUri {
            url: raw.to_owned(),
            kind: InvalidUriKind::MissingTrailingSlash,
            reason: format!("base URL must have a trailing slash, but {raw:?} does not"),
        });
    }

    Ok(url)
}

/// Join `path` under `base`. A leading `/` is ignored; the result never leaves the base origin.
fn resolve(base: &Url, path: &str, query: Option<&str>) -> Result<Url, ClientError> {
    let relative = path.trim_start_matches('/');
    let mut url = base.join(relative).map_err(|e| ClientError::InvalidUri {
        url: relative.to_owned(),
        kind: InvalidUriKind::ParseError,
        reason: e.to_string(),
    })?;

    if url.origin() != base.origin() {
        return Err(ClientError::InvalidUri {
            url: url.to_string(),
            kind: InvalidUriKind::ParseError,
            reason: "request path escapes the base URL".to_owned(),
        });
    }

    if let Some(query) = query {
        url.set_query(Some(query));
    }
    Ok(url)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde::Serialize;

    fn base() -> Url {
        Url::parse("https://lichess.org/").unwrap()
    }

    #[derive(Serialize)]
    struct Page {
        since: i64,
        max: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        opening: Option<bool>,
    }

    #[test]
    fn test_base_url_requires_trailing_slash() {
        let err = validate_base_url("https://lichess.org/api", TransportSecurity::TlsOnly)
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidUri {
                kind: InvalidUriKind::MissingTrailingSlash,
                ..
            }
        ));

        validate_base_url("https://lichess.org", TransportSecurity::TlsOnly).unwrap();
        validate_base_url("https://proxy.local/lichess/", TransportSecurity::TlsOnly).unwrap();
    }

    #[test]
    fn test_base_url_scheme_follows_transport_security() {
        assert!(matches!(
            validate_base_url("http://localhost:8080/", TransportSecurity::TlsOnly),
            Err(ClientError::InvalidScheme { .. })
        ));
        validate_base_url("http://localhost:8080/", TransportSecurity::AllowInsecureHttp).unwrap();
        assert!(matches!(
            validate_base_url("ftp://lichess.org/", TransportSecurity::AllowInsecureHttp),
            Err(ClientError::InvalidScheme { .. })
        ));
        assert!(matches!(
            validate_base_url("lichess.org/", TransportSecurity::TlsOnly),
            Err(ClientError::InvalidUri {
                kind: InvalidUriKind::MissingScheme,
                ..
            })
        ));
    }

    #[test]
    fn test_path_resolves_under_base_prefix() {
        let base = Url::parse("https://proxy.local/lichess/").unwrap();

        let url = resolve(&base, "/api/user/thibault", None).unwrap();
        assert_eq!(url.as_str(), "https://proxy.local/lichess/api/user/thibault");
    }

    #[test]
    fn test_path_cannot_escape_origin() {
        let url = resolve(&base(), "//evil.example/x", None).unwrap();
        assert_eq!(url.as_str(), "https://lichess.org/evil.example/x");

        let err = resolve(&base(), "https://evil.example/x", None).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUri { .. }));
    }

    #[test]
    fn test_query_encoding_skips_none() {
        let request = RequestDescriptor::get("api/games/user/thibault")
            .query(&Page {
                since: 1_500_000_000_000,
                max: 50,
                opening: None,
            })
            .unwrap();

        assert_eq!(request.query_string(), Some("since=1500000000000&max=50"));
    }

    #[test]
    fn test_accept_follows_shape() {
        let single = RequestDescriptor::get("api/account")
            .into_http(&base(), Shape::Single)
            .unwrap();
        assert_eq!(single.headers()[ACCEPT], MEDIA_TYPE_JSON);

        let stream = RequestDescriptor::get("api/games/user/thibault")
            .into_http(&base(), Shape::Stream)
            .unwrap();
        assert_eq!(stream.headers()[ACCEPT], MEDIA_TYPE_NDJSON);
        assert_eq!(
            stream.uri().to_string(),
            "https://lichess.org/api/games/user/thibault"
        );
    }

    #[test]
    fn test_explicit_accept_wins() {
        let request = RequestDescriptor::get("game/export/abcd1234")
            .header(ACCEPT, "application/x-chess-pgn")
            .unwrap()
            .into_http(&base(), Shape::Single)
            .unwrap();

        assert_eq!(request.headers()[ACCEPT], "application/x-chess-pgn");
    }

    #[tokio::test]
    async fn test_json_body_sets_content_type() {
        let request = RequestDescriptor::post("api/challenge/open")
            .json(&serde_json::json!({"rated": false}))
            .unwrap()
            .into_http(&base(), Shape::Single)
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.headers()[CONTENT_TYPE], MEDIA_TYPE_JSON);
        let body = request.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"rated":false}"#);
    }
}
