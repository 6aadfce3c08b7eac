//! Error types for verdict.

use derive_more::Display;
use serde_json::Value;

use crate::{Envelope, Response, TransportError};

/// Boxed low-level cause, as handed to the classifier.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ============================================================================
// Error Kind
// ============================================================================

/// Fieldless view of an [`Error`], for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// The request or a socket operation timed out.
    #[display("timeout")]
    Timeout,
    /// The host could not be resolved while the device is online.
    #[display("server")]
    Server,
    /// The host could not be resolved and the device is offline.
    #[display("network")]
    Network,
    /// The call was cancelled or aborted by an I/O failure.
    #[display("cancelled")]
    Cancelled,
    /// The response body could not be read or decoded.
    #[display("data_decode")]
    DataDecode,
    /// The response status was not successful.
    #[display("response_unsuccessful")]
    ResponseUnsuccessful,
    /// The envelope reported an application-level failure.
    #[display("result_failure")]
    ResultFailure,
    /// The envelope reported an expired login.
    #[display("token_expired")]
    TokenExpired,
    /// Anything the classifier does not recognise.
    #[display("generic")]
    Generic,
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for verdict operations.
///
/// Every variant carries a human-readable message. Variants built from a
/// low-level failure keep that failure as their [`source`].
///
/// [`source`]: std::error::Error::source
#[derive(Debug, Display)]
pub enum Error {
    /// The request timed out.
    #[display("{message}")]
    Timeout {
        /// Error message.
        message: String,
        /// Original failure.
        source: BoxError,
    },

    /// Host resolution failed although the device is connected.
    #[display("{message}")]
    Server {
        /// Error message.
        message: String,
        /// Original failure.
        source: BoxError,
    },

    /// Host resolution failed and the device is not connected.
    #[display("{message}")]
    Network {
        /// Error message.
        message: String,
        /// Original failure.
        source: BoxError,
    },

    /// The call was cancelled, or failed with a residual I/O error.
    #[display("{message}")]
    Cancelled {
        /// Error message.
        message: String,
        /// Original failure.
        source: BoxError,
    },

    /// The body could not be read, or did not decode into the target.
    #[display("{message}")]
    DataDecode {
        /// Error message.
        message: String,
        /// Original failure.
        source: BoxError,
    },

    /// Non-2xx status. The response is kept, body unread.
    #[display("{message}")]
    ResponseUnsuccessful {
        /// Error message.
        message: String,
        /// The rejected response.
        response: Box<Response>,
    },

    /// The envelope carried a failure code.
    #[display("{message}")]
    ResultFailure {
        /// Message taken from the envelope.
        message: String,
        /// The full envelope.
        envelope: Envelope<Value>,
    },

    /// The envelope signalled an expired login (code `1001`).
    #[display("{message}")]
    TokenExpired {
        /// Message taken from the envelope.
        message: String,
    },

    /// Unrecognised failure.
    #[display("{message}")]
    Generic {
        /// Error message.
        message: String,
        /// Original failure.
        source: BoxError,
    },
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timeout { source, .. }
            | Self::Server { source, .. }
            | Self::Network { source, .. }
            | Self::Cancelled { source, .. }
            | Self::DataDecode { source, .. }
            | Self::Generic { source, .. } => Some(&**source),
            Self::ResponseUnsuccessful { .. }
            | Self::ResultFailure { .. }
            | Self::TokenExpired { .. } => None,
        }
    }
}

impl Error {
    /// Create a data decode error wrapping its cause.
    #[must_use]
    pub fn data_decode(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::DataDecode {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Create a cancellation error wrapping its cause.
    #[must_use]
    pub fn cancelled(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Cancelled {
            message: message.into(),
            source: source.into(),
        }
    }

    /// The kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Server { .. } => ErrorKind::Server,
            Self::Network { .. } => ErrorKind::Network,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::DataDecode { .. } => ErrorKind::DataDecode,
            Self::ResponseUnsuccessful { .. } => ErrorKind::ResponseUnsuccessful,
            Self::ResultFailure { .. } => ErrorKind::ResultFailure,
            Self::TokenExpired { .. } => ErrorKind::TokenExpired,
            Self::Generic { .. } => ErrorKind::Generic,
        }
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Timeout { message, .. }
            | Self::Server { message, .. }
            | Self::Network { message, .. }
            | Self::Cancelled { message, .. }
            | Self::DataDecode { message, .. }
            | Self::ResponseUnsuccessful { message, .. }
            | Self::ResultFailure { message, .. }
            | Self::TokenExpired { message }
            | Self::Generic { message, .. } => message,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is an expired login.
    #[must_use]
    pub const fn is_token_expired(&self) -> bool {
        matches!(self, Self::TokenExpired { .. })
    }

    /// Returns `true` if the call was cancelled through its handle,
    /// as opposed to failing with some other I/O error.
    #[must_use]
    pub fn is_user_cancelled(&self) -> bool {
        let Self::Cancelled { source, .. } = self else {
            return false;
        };
        let source: &(dyn std::error::Error + 'static) = &**source;
        if let Some(transport) = source.downcast_ref::<TransportError>() {
            return transport.is_cancelled();
        }
        source
            .downcast_ref::<std::io::Error>()
            .and_then(std::io::Error::get_ref)
            .and_then(|inner| inner.downcast_ref::<TransportError>())
            .is_some_and(TransportError::is_cancelled)
    }

    /// The rejected response, for [`Error::ResponseUnsuccessful`].
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::ResponseUnsuccessful { response, .. } => Some(&**response),
            _ => None,
        }
    }

    /// Consume into the rejected response, for [`Error::ResponseUnsuccessful`].
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::ResponseUnsuccessful { response, .. } => Some(*response),
            _ => None,
        }
    }

    /// The HTTP status of a rejected response.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        self.response().map(Response::status)
    }

    /// The envelope of a [`Error::ResultFailure`].
    #[must_use]
    pub const fn envelope(&self) -> Option<&Envelope<Value>> {
        match self {
            Self::ResultFailure { envelope, .. } => Some(envelope),
            _ => None,
        }
    }

    /// The envelope code of a [`Error::ResultFailure`] or [`Error::TokenExpired`].
    #[must_use]
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::ResultFailure { envelope, .. } => Some(envelope.code),
            Self::TokenExpired { .. } => Some(crate::TOKEN_EXPIRED_CODE),
            _ => None,
        }
    }
}
