//! Failure classification.
//!
//! [`classify`] maps a low-level failure onto the domain [`Error`] taxonomy.
//! Errors that are already classified pass through untouched.

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use derive_more::Display;

use crate::{BoxError, Error, Messages};

// ============================================================================
// Transport Error
// ============================================================================

/// Failure reported by a transport before classification.
#[derive(Debug, Display)]
pub enum TransportError {
    /// The request did not complete in time.
    #[display("request timed out")]
    Timeout,

    /// The host name could not be resolved.
    #[display("failed to resolve host: {message}")]
    HostResolution {
        /// Error message.
        message: String,
        /// Underlying resolver error.
        source: Option<BoxError>,
    },

    /// The connection could not be established or was lost.
    #[display("connection error: {message}")]
    Connect {
        /// Error message.
        message: String,
        /// Underlying error.
        source: Option<BoxError>,
    },

    /// The call was cancelled through its handle.
    #[display("request cancelled")]
    Cancelled,
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::HostResolution { source, .. } | Self::Connect { source, .. } => {
                source.as_deref().map(|s| s as &(dyn std::error::Error + 'static))
            }
            Self::Timeout | Self::Cancelled => None,
        }
    }
}

impl TransportError {
    /// Create a host resolution error.
    #[must_use]
    pub fn host_resolution(message: impl Into<String>) -> Self {
        Self::HostResolution {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// ============================================================================
// Connectivity Probe
// ============================================================================

/// Tells whether the device currently has network connectivity.
///
/// Queried only when a host name fails to resolve.
pub trait ConnectivityProbe: Send + Sync {
    /// Returns `true` if a network is connected.
    fn is_connected(&self) -> bool;
}

impl<F> ConnectivityProbe for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_connected(&self) -> bool {
        self()
    }
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticProbe(pub bool);

impl ConnectivityProbe for StaticProbe {
    fn is_connected(&self) -> bool {
        self.0
    }
}

/// Probe that opens a TCP connection to a well-known address.
///
/// The check blocks for up to its timeout. [`Handler`](crate::Handler) runs
/// probes on the blocking thread pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpProbe {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpProbe {
    /// Probe `addr`, giving up after `timeout`.
    #[must_use]
    pub const fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(
            SocketAddr::from(([1, 1, 1, 1], 53)),
            Duration::from_millis(1500),
        )
    }
}

impl ConnectivityProbe for TcpProbe {
    fn is_connected(&self) -> bool {
        TcpStream::connect_timeout(&self.addr, self.timeout).is_ok()
    }
}

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LowLevel {
    Timeout,
    HostResolution,
    Io,
}

/// Classify a failure into a domain [`Error`].
///
/// The cause and its `source()` chain are inspected outermost first, and
/// the first recognised failure decides:
///
/// | Failure | Result |
/// |---------|--------|
/// | already an [`Error`] | unchanged |
/// | [`TransportError::Timeout`], [`io::ErrorKind::TimedOut`] | [`Error::Timeout`] |
/// | [`TransportError::HostResolution`] | [`Error::Server`] if `probe` is connected, else [`Error::Network`] |
/// | [`TransportError::Cancelled`], any other [`io::Error`] | [`Error::Cancelled`] |
/// | anything else | [`Error::Generic`] |
///
/// The original cause becomes the `source()` of the result.
#[must_use]
pub fn classify(cause: BoxError, probe: &dyn ConnectivityProbe, messages: &Messages) -> Error {
    let cause = match cause.downcast::<Error>() {
        Ok(error) => return *error,
        Err(cause) => cause,
    };

    match low_level(&*cause) {
        Some(LowLevel::Timeout) => Error::Timeout {
            message: messages.timeout.clone(),
            source: cause,
        },
        Some(LowLevel::HostResolution) => {
            if probe.is_connected() {
                Error::Server {
                    message: messages.server.clone(),
                    source: cause,
                }
            } else {
                Error::Network {
                    message: messages.network.clone(),
                    source: cause,
                }
            }
        }
        Some(LowLevel::Io) => Error::Cancelled {
            message: messages.cancelled.clone(),
            source: cause,
        },
        None => Error::Generic {
            message: cause.to_string(),
            source: cause,
        },
    }
}

/// Returns `true` if classifying `cause` depends on the connectivity probe.
#[must_use]
pub fn needs_connectivity(cause: &(dyn std::error::Error + 'static)) -> bool {
    !cause.is::<Error>() && low_level(cause) == Some(LowLevel::HostResolution)
}

fn low_level(cause: &(dyn std::error::Error + 'static)) -> Option<LowLevel> {
    let mut current = Some(cause);
    while let Some(err) = current {
        if let Some(kind) = recognise(err) {
            return Some(kind);
        }
        current = err.source();
    }
    None
}

fn recognise(err: &(dyn std::error::Error + 'static)) -> Option<LowLevel> {
    if let Some(transport) = err.downcast_ref::<TransportError>() {
        return match transport {
            TransportError::Timeout => Some(LowLevel::Timeout),
            TransportError::HostResolution { .. } => Some(LowLevel::HostResolution),
            TransportError::Cancelled => Some(LowLevel::Io),
            // Not decisive: the chain below tells what the connection hit.
            TransportError::Connect { .. } => None,
        };
    }

    let io_err = err.downcast_ref::<io::Error>()?;
    if io_err.kind() == io::ErrorKind::TimedOut {
        return Some(LowLevel::Timeout);
    }
    // `io::Error::source` skips a custom payload, so look at it directly.
    io_err
        .get_ref()
        .and_then(|inner| recognise(inner))
        .or(Some(LowLevel::Io))
}
