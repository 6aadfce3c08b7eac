//! HTTP response handling.
//!
//! [`Response`] gives access to status and headers, and owns an optional
//! [`Body`]. A body is either buffered or a stream of chunks that is read
//! only when a decoder asks for it.

use std::io;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;
use http::{HeaderMap, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::TransportError;

/// A streaming body: chunks of bytes arriving over time.
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

// ============================================================================
// Body
// ============================================================================

enum Kind {
    Full(Bytes),
    // Only ever unwrapped with `into_inner`, never locked.
    Streaming(Mutex<BodyStream>),
}

/// Response body, read at most once.
pub struct Body {
    kind: Kind,
    cancel: Option<CancellationToken>,
}

impl Body {
    /// A body whose bytes are already in memory.
    #[must_use]
    pub fn full(bytes: impl Into<Bytes>) -> Self {
        Self {
            kind: Kind::Full(bytes.into()),
            cancel: None,
        }
    }

    /// A body read from a stream of chunks.
    #[must_use]
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            kind: Kind::Streaming(Mutex::new(Box::pin(stream))),
            cancel: None,
        }
    }

    /// Abort reads once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns `true` if the body is a stream not yet read.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self.kind, Kind::Streaming(_))
    }

    /// Read the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns the first chunk error, or an [`io::ErrorKind::Interrupted`]
    /// error wrapping [`TransportError::Cancelled`] if the token fires first.
    pub async fn bytes(self) -> io::Result<Bytes> {
        let Self { kind, cancel } = self;

        if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(cancelled_read());
        }

        let mut stream = match kind {
            Kind::Full(bytes) => return Ok(bytes),
            Kind::Streaming(stream) => stream.into_inner().unwrap_or_else(PoisonError::into_inner),
        };

        let mut collected = BytesMut::new();
        loop {
            let next = match &cancel {
                Some(token) => tokio::select! {
                    biased;
                    () = token.cancelled() => return Err(cancelled_read()),
                    next = stream.next() => next,
                },
                None => stream.next().await,
            };

            match next {
                Some(chunk) => collected.extend_from_slice(&chunk?),
                None => break,
            }
        }

        Ok(collected.freeze())
    }
}

fn cancelled_read() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, TransportError::Cancelled)
}

/// Returns `true` if a read error was raised by [`Body::bytes`] on cancellation.
#[must_use]
pub fn is_cancelled_read(err: &io::Error) -> bool {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<TransportError>())
        .is_some_and(TransportError::is_cancelled)
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Body");
        match &self.kind {
            Kind::Full(bytes) => debug.field("len", &bytes.len()),
            Kind::Streaming(_) => debug.field("streaming", &true),
        };
        debug.field("cancellable", &self.cancel.is_some()).finish()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::full(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::full(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::full(text)
    }
}

// ============================================================================
// Response
// ============================================================================

/// HTTP response with status, headers, and an optional body.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Body>,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Option<Body>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Single header value by name, if it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> Option<Body> {
        self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Option<Body>) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Status is 4xx.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Status is 5xx.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}

impl<B: Into<Body>> From<http::Response<B>> for Response {
    fn from(response: http::Response<B>) -> Self {
        let (parts, body) = response.into_parts();
        Self::new(parts.status, parts.headers, Some(body.into()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::stream;

    use super::*;

    #[test]
    fn response_basic() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );

        let response = Response::new(StatusCode::OK, headers, Some(Body::full(r#"{"id":1}"#)));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.is_success());
        assert!(!response.is_client_error());
        assert!(!response.is_server_error());
        assert!(response.body().is_some());
    }

    #[test]
    fn response_status_checks() {
        let response = Response::new(StatusCode::NOT_FOUND, HeaderMap::new(), None);
        assert!(response.is_client_error());
        assert!(!response.is_success());

        let response = Response::new(StatusCode::BAD_GATEWAY, HeaderMap::new(), None);
        assert!(response.is_server_error());
    }

    #[test]
    fn response_from_http() {
        let response: Response = http::Response::builder()
            .status(201)
            .body("created")
            .expect("response")
            .into();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response.into_body().expect("body");
        assert!(!body.is_streaming());
    }

    #[tokio::test]
    async fn body_full_bytes() {
        let body = Body::full("Hello, World!");
        let bytes = body.bytes().await.expect("bytes");
        assert_eq!(bytes.as_ref(), b"Hello, World!");
    }

    #[tokio::test]
    async fn body_stream_collects_chunks() {
        let chunks = vec![Ok(Bytes::from("Hello, ")), Ok(Bytes::from("World!"))];
        let body = Body::from_stream(stream::iter(chunks));
        assert!(body.is_streaming());

        let bytes = body.bytes().await.expect("bytes");
        assert_eq!(bytes.as_ref(), b"Hello, World!");
    }

    #[tokio::test]
    async fn body_stream_error() {
        let chunks = vec![
            Ok(Bytes::from("partial")),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
        ];
        let body = Body::from_stream(stream::iter(chunks));

        let err = body.bytes().await.expect_err("should fail");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(!is_cancelled_read(&err));
    }

    #[tokio::test]
    async fn body_cancelled_before_read() {
        let token = CancellationToken::new();
        token.cancel();

        let body = Body::full("ignored").with_cancellation(token);
        let err = body.bytes().await.expect_err("should fail");
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        assert!(is_cancelled_read(&err));
    }

    #[tokio::test]
    async fn body_cancelled_while_pending() {
        let token = CancellationToken::new();
        let body = Body::from_stream(stream::pending::<io::Result<Bytes>>())
            .with_cancellation(token.clone());

        let canceller = token.clone();
        let read = tokio::spawn(body.bytes());
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();

        let err = read.await.expect("join").expect_err("should fail");
        assert!(is_cancelled_read(&err));
    }
}
