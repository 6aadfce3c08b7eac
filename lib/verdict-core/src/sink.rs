//! Diagnostic log sink.

use tracing::{debug, warn};

use crate::Error;

/// Receives response bodies and classified errors for diagnostics.
///
/// Calls are fire-and-forget and never influence decoding.
pub trait DiagnosticSink: Send + Sync {
    /// A response body about to be parsed.
    fn log_json(&self, text: &str);

    /// A classified error about to be returned.
    fn log_error(&self, error: &Error);
}

/// Sink writing to `tracing`.
///
/// Bodies go to `debug`, errors to `warn` with their kind and source.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log_json(&self, text: &str) {
        debug!(body = %text, "response body");
    }

    fn log_error(&self, error: &Error) {
        let source = std::error::Error::source(error).map(ToString::to_string);
        warn!(kind = %error.kind(), error = %error, source = ?source, "request failed");
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn log_json(&self, _text: &str) {}

    fn log_error(&self, _error: &Error) {}
}
