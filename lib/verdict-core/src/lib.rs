//! Core types and traits for verdict response handling.
//!
//! This crate provides the transport-agnostic pieces of verdict:
//! - [`decode`] - Decode a [`Response`] into the value a [`Target`] asks for
//! - [`Envelope`] - `code` / `message` / `data` wrapper with success and failure codes
//! - [`classify`] - Map low-level failures onto [`Error`]
//! - [`ConnectivityProbe`] - Tells server-side from network-side resolution failures
//! - [`Lifecycle`] - Loading indicators per in-flight [`Call`]
//! - [`RequestHandler`] and [`Handler`] - The hooks a transport calls around a request
//! - [`DiagnosticSink`] - Where bodies and errors are logged
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod classifier;
mod config;
mod decoder;
mod envelope;
mod error;
mod handler;
mod lifecycle;
pub mod prelude;
mod response;
mod sink;
mod target;

pub use classifier::{
    ConnectivityProbe, StaticProbe, TcpProbe, TransportError, classify, needs_connectivity,
};
pub use config::{HandlerConfig, HandlerConfigBuilder, Messages};
pub use decoder::decode;
pub use envelope::{Envelope, SUCCESS_CODE, TOKEN_EXPIRED_CODE};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use handler::{Handler, HandlerBuilder, ReauthHook, RequestHandler};
pub use lifecycle::{Call, CallId, Headless, Indicator, IndicatorFactory, Lifecycle, NoopIndicator};
pub use response::{Body, BodyStream, Response, is_cancelled_read};
pub use sink::{DiagnosticSink, NullSink, TracingSink};
pub use target::{Decoded, Target};

// Re-export http crate types for status codes and headers
pub use http::{HeaderMap, StatusCode, header};

// Re-export the image type returned for `Target::BinaryImage`
pub use image::DynamicImage;
