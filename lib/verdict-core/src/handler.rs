//! The request handler.
//!
//! A [`RequestHandler`] is called by a transport at four points of a call:
//! start, end, success and failure. [`Handler`] is the standard
//! implementation built from decoding, classification and a [`Lifecycle`].

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::{
    BoxError, Call, ConnectivityProbe, Decoded, DiagnosticSink, Error, HandlerConfig, Headless,
    IndicatorFactory, Lifecycle, Response, Result, StaticProbe, Target, TcpProbe, TracingSink,
    classify, decode, needs_connectivity,
};

/// Hook invoked when a response reports an expired login.
pub type ReauthHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// Hooks a transport calls around each request.
pub trait RequestHandler: Send + Sync {
    /// UI context for loading indicators.
    type Context: ?Sized;

    /// The call is about to be sent.
    fn request_start(&self, context: Option<&Self::Context>, call: &Call);

    /// The call finished, successfully or not.
    fn request_end(&self, call: &Call);

    /// Decode a received response.
    fn request_succeed<T: DeserializeOwned + Send>(
        &self,
        response: Response,
        target: Target,
    ) -> impl Future<Output = Result<Option<Decoded<T>>>> + Send;

    /// Classify a failure from any stage of the call.
    fn request_fail(&self, cause: BoxError) -> impl Future<Output = Error> + Send;
}

/// Standard [`RequestHandler`].
///
/// # Example
///
/// ```ignore
/// use verdict_core::{Handler, HandlerConfig, StaticProbe};
///
/// let handler = Handler::builder(MyDialogs::new())
///     .config(HandlerConfig::builder().loading_message("Please wait").build())
///     .probe(StaticProbe(true))
///     .on_token_expired(|_| open_login_screen())
///     .build();
/// ```
pub struct Handler<F: IndicatorFactory> {
    config: HandlerConfig,
    lifecycle: Lifecycle<F>,
    probe: Arc<dyn ConnectivityProbe>,
    sink: Arc<dyn DiagnosticSink>,
    on_token_expired: Option<ReauthHook>,
}

impl<F: IndicatorFactory> std::fmt::Debug for Handler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle)
            .field("on_token_expired", &self.on_token_expired.is_some())
            .finish_non_exhaustive()
    }
}

impl Handler<Headless> {
    /// A handler without indicators, using default settings.
    #[must_use]
    pub fn headless() -> Self {
        Self::builder(Headless).build()
    }
}

impl<F: IndicatorFactory> Handler<F> {
    /// Create a new handler builder.
    #[must_use]
    pub fn builder(factory: F) -> HandlerBuilder<F> {
        HandlerBuilder::new(factory)
    }

    /// Handler configuration.
    #[must_use]
    pub const fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Indicator lifecycle.
    #[must_use]
    pub const fn lifecycle(&self) -> &Lifecycle<F> {
        &self.lifecycle
    }

    async fn is_connected(&self) -> bool {
        let probe = Arc::clone(&self.probe);
        tokio::task::spawn_blocking(move || probe.is_connected())
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "connectivity probe did not complete");
                false
            })
    }
}

impl<F: IndicatorFactory> RequestHandler for Handler<F> {
    type Context = F::Context;

    fn request_start(&self, context: Option<&F::Context>, call: &Call) {
        self.lifecycle.start(context, call);
    }

    fn request_end(&self, call: &Call) {
        self.lifecycle.end(call);
    }

    async fn request_succeed<T: DeserializeOwned + Send>(
        &self,
        response: Response,
        target: Target,
    ) -> Result<Option<Decoded<T>>> {
        decode(response, target, &self.config.messages, &*self.sink).await
    }

    async fn request_fail(&self, cause: BoxError) -> Error {
        let connected = if needs_connectivity(&*cause) {
            self.is_connected().await
        } else {
            true
        };
        let error = classify(cause, &StaticProbe(connected), &self.config.messages);
        if error.is_token_expired()
            && let Some(hook) = &self.on_token_expired
        {
            hook(&error);
        }
        self.sink.log_error(&error);
        error
    }
}

/// Builder for [`Handler`].
pub struct HandlerBuilder<F> {
    factory: F,
    config: Option<HandlerConfig>,
    probe: Option<Arc<dyn ConnectivityProbe>>,
    sink: Option<Arc<dyn DiagnosticSink>>,
    on_token_expired: Option<ReauthHook>,
}

impl<F> std::fmt::Debug for HandlerBuilder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBuilder")
            .field("config", &self.config)
            .field("probe", &self.probe.is_some())
            .field("sink", &self.sink.is_some())
            .field("on_token_expired", &self.on_token_expired.is_some())
            .finish_non_exhaustive()
    }
}

impl<F: IndicatorFactory> HandlerBuilder<F> {
    /// Creates a new builder around an indicator factory.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            config: None,
            probe: None,
            sink: None,
            on_token_expired: None,
        }
    }

    /// Set the configuration (default: [`HandlerConfig::default`]).
    #[must_use]
    pub fn config(mut self, config: HandlerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the connectivity probe (default: [`TcpProbe::default`]).
    ///
    /// The probe runs on the blocking thread pool, only for host resolution
    /// failures.
    #[must_use]
    pub fn probe(mut self, probe: impl ConnectivityProbe + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    /// Set the diagnostic sink (default: [`TracingSink`]).
    #[must_use]
    pub fn sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Run `hook` whenever a response reports an expired login.
    #[must_use]
    pub fn on_token_expired(mut self, hook: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_token_expired = Some(Arc::new(hook));
        self
    }

    /// Build the handler.
    #[must_use]
    pub fn build(self) -> Handler<F> {
        let config = self.config.unwrap_or_default();
        let lifecycle = Lifecycle::new(
            self.factory,
            config.messages.loading.clone(),
            config.cancelable,
        );
        Handler {
            config,
            lifecycle,
            probe: self.probe.unwrap_or_else(|| Arc::new(TcpProbe::default())),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            on_token_expired: self.on_token_expired,
        }
    }
}
