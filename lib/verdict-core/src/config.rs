//! Handler configuration types.

/// Fixed messages attached to classified errors and indicators.
///
/// Envelope failures carry the envelope's own message instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    /// Text shown by the loading indicator.
    pub loading: String,
    /// [`Error::Timeout`](crate::Error::Timeout).
    pub timeout: String,
    /// [`Error::Server`](crate::Error::Server) and
    /// [`Error::ResponseUnsuccessful`](crate::Error::ResponseUnsuccessful).
    pub server: String,
    /// [`Error::Network`](crate::Error::Network).
    pub network: String,
    /// [`Error::Cancelled`](crate::Error::Cancelled).
    pub cancelled: String,
    /// [`Error::DataDecode`](crate::Error::DataDecode).
    pub data_decode: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            loading: "Loading...".to_string(),
            timeout: "The server took too long to respond, please try again later".to_string(),
            server: "The server responded with an error, please try again later".to_string(),
            network: "The network is unavailable, please check your connection".to_string(),
            cancelled: "The request was cancelled".to_string(),
            data_decode: "The response data could not be parsed".to_string(),
        }
    }
}

/// Configuration for a [`Handler`](crate::Handler).
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Messages for errors and indicators.
    pub messages: Messages,
    /// Whether cancelling an indicator cancels its call.
    pub cancelable: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            messages: Messages::default(),
            cancelable: true,
        }
    }
}

impl HandlerConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> HandlerConfigBuilder {
        HandlerConfigBuilder::default()
    }
}

/// Builder for [`HandlerConfig`].
#[derive(Debug, Clone, Default)]
pub struct HandlerConfigBuilder {
    loading: Option<String>,
    timeout: Option<String>,
    server: Option<String>,
    network: Option<String>,
    cancelled: Option<String>,
    data_decode: Option<String>,
    cancelable: Option<bool>,
}

impl HandlerConfigBuilder {
    /// Set the loading indicator text.
    #[must_use]
    pub fn loading_message(mut self, message: impl Into<String>) -> Self {
        self.loading = Some(message.into());
        self
    }

    /// Set the timeout message.
    #[must_use]
    pub fn timeout_message(mut self, message: impl Into<String>) -> Self {
        self.timeout = Some(message.into());
        self
    }

    /// Set the server error message.
    #[must_use]
    pub fn server_message(mut self, message: impl Into<String>) -> Self {
        self.server = Some(message.into());
        self
    }

    /// Set the network error message.
    #[must_use]
    pub fn network_message(mut self, message: impl Into<String>) -> Self {
        self.network = Some(message.into());
        self
    }

    /// Set the cancellation message.
    #[must_use]
    pub fn cancelled_message(mut self, message: impl Into<String>) -> Self {
        self.cancelled = Some(message.into());
        self
    }

    /// Set the data decode message.
    #[must_use]
    pub fn data_decode_message(mut self, message: impl Into<String>) -> Self {
        self.data_decode = Some(message.into());
        self
    }

    /// Set whether cancelling an indicator cancels its call.
    #[must_use]
    pub const fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = Some(cancelable);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> HandlerConfig {
        let defaults = HandlerConfig::default();
        let messages = defaults.messages;
        HandlerConfig {
            messages: Messages {
                loading: self.loading.unwrap_or(messages.loading),
                timeout: self.timeout.unwrap_or(messages.timeout),
                server: self.server.unwrap_or(messages.server),
                network: self.network.unwrap_or(messages.network),
                cancelled: self.cancelled.unwrap_or(messages.cancelled),
                data_decode: self.data_decode.unwrap_or(messages.data_decode),
            },
            cancelable: self.cancelable.unwrap_or(defaults.cancelable),
        }
    }
}
