//! HTTP client implementation using hyper-util.

use std::io;
use std::time::Instant;

use bytes::Bytes;
use futures_util::TryStreamExt;
use http::StatusCode;
use http_body_util::{BodyStream, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use verdict_core::{
    Body, BoxError, Call, Decoded, RequestHandler, Response, Result, Target, TransportError,
};

use crate::{
    config::{ClientConfig, ClientConfigBuilder},
    connector::https_connector,
};

/// HTTP client driving a [`RequestHandler`] around each call.
///
/// # Example
///
/// ```ignore
/// use verdict::{Handler, HyperClient, Target};
///
/// let client = HyperClient::new();
/// let handler = Handler::headless();
///
/// let user = client
///     .get::<_, User>(&handler, None, "https://api.example.com/users/1", Target::Model)
///     .await?
///     .and_then(Decoded::into_model);
/// ```
#[derive(Clone)]
pub struct HyperClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Create a new client with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let connector = https_connector(config.connect_timeout);
        let inner = Client::builder(TokioExecutor::new()).build(connector);
        Self { inner, config }
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> HyperClientBuilder {
        HyperClientBuilder::default()
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `request` and return the response with its body unread.
    ///
    /// The request phase is bounded by [`ClientConfig::timeout`] and aborted
    /// when `call` is cancelled. The returned body stops reading once `call`
    /// is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an unclassified [`TransportError`], boxed, for the handler's
    /// `request_fail`.
    pub async fn send(
        &self,
        request: http::Request<Bytes>,
        call: &Call,
    ) -> std::result::Result<Response, BoxError> {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let request = request.map(Full::new);

        info!(%method, %uri, call = %call.id(), "sending request");
        let start = Instant::now();

        let outcome = tokio::select! {
            biased;
            () = call.token().cancelled() => Err(TransportError::Cancelled),
            result = tokio::time::timeout(self.config.timeout, self.inner.request(request)) => {
                match result {
                    Ok(Ok(response)) => Ok(response),
                    Ok(Err(err)) => Err(Self::map_hyper_error(err)),
                    Err(_) => Err(TransportError::Timeout),
                }
            }
        };

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                warn!(%method, %uri, error = %err, elapsed_ms, "request failed");
                return Err(err.into());
            }
        };
        info!(%method, %uri, status = response.status().as_u16(), elapsed_ms, "response received");

        let (parts, incoming) = response.into_parts();
        if matches!(parts.status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT) {
            return Ok(Response::new(parts.status, parts.headers, None));
        }
        let stream = BodyStream::new(incoming)
            .try_filter_map(|frame| async move { Ok(frame.into_data().ok()) })
            .map_err(io::Error::other);
        let body = Body::from_stream(stream).with_cancellation(call.token().clone());

        Ok(Response::new(parts.status, parts.headers, Some(body)))
    }

    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> TransportError {
        let message = error_chain(&err);
        let source: BoxError = Box::new(err);

        if message.contains("dns error") {
            TransportError::HostResolution {
                message,
                source: Some(source),
            }
        } else {
            TransportError::Connect {
                message,
                source: Some(source),
            }
        }
    }

    /// Run one call through `handler`.
    ///
    /// `request_start` runs before sending and `request_end` after the
    /// outcome is known, whether it is a value or an error. `request_end`
    /// also runs if the returned future is dropped early. Every failure,
    /// including decoding failures, is passed through `request_fail`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by the handler's `request_fail`.
    pub async fn execute<H, T>(
        &self,
        handler: &H,
        context: Option<&H::Context>,
        request: http::Request<Bytes>,
        target: Target,
    ) -> Result<Option<Decoded<T>>>
    where
        H: RequestHandler,
        T: DeserializeOwned + Send,
    {
        self.execute_with(handler, context, request, target, &Call::new())
            .await
    }

    /// Like [`execute`](Self::execute), with a caller-owned [`Call`] so the
    /// call can be cancelled from elsewhere.
    ///
    /// # Errors
    ///
    /// Returns the error produced by the handler's `request_fail`.
    pub async fn execute_with<H, T>(
        &self,
        handler: &H,
        context: Option<&H::Context>,
        request: http::Request<Bytes>,
        target: Target,
        call: &Call,
    ) -> Result<Option<Decoded<T>>>
    where
        H: RequestHandler,
        T: DeserializeOwned + Send,
    {
        handler.request_start(context, call);
        let _end = EndGuard { handler, call };

        let outcome = match self.send(request, call).await {
            Ok(response) => handler
                .request_succeed::<T>(response, target)
                .await
                .map_err(BoxError::from),
            Err(cause) => Err(cause),
        };

        match outcome {
            Ok(decoded) => Ok(decoded),
            Err(cause) => Err(handler.request_fail(cause).await),
        }
    }

    /// `GET` `uri` through `handler`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by the handler's `request_fail`, including
    /// for a `uri` that cannot be parsed.
    pub async fn get<H, T>(
        &self,
        handler: &H,
        context: Option<&H::Context>,
        uri: &str,
        target: Target,
    ) -> Result<Option<Decoded<T>>>
    where
        H: RequestHandler,
        T: DeserializeOwned + Send,
    {
        let request = match http::Request::get(uri).body(Bytes::new()) {
            Ok(request) => request,
            Err(err) => return Err(handler.request_fail(Box::new(err)).await),
        };
        self.execute(handler, context, request, target).await
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Ends the call when dropped, so an abandoned future still dismisses its
/// indicator.
struct EndGuard<'a, H: RequestHandler> {
    handler: &'a H,
    call: &'a Call,
}

impl<H: RequestHandler> Drop for EndGuard<'_, H> {
    fn drop(&mut self) {
        self.handler.request_end(self.call);
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    std::iter::successors(Some(err), |e| e.source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

/// Builder for [`HyperClient`].
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use verdict::HyperClient;
///
/// let client = HyperClient::builder()
///     .with_timeout(Duration::from_secs(5))
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct HyperClientBuilder {
    config: ClientConfigBuilder,
}

impl HyperClientBuilder {
    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Build the client.
    #[must_use]
    pub fn build(self) -> HyperClient {
        HyperClient::with_config(self.config.build())
    }
}
