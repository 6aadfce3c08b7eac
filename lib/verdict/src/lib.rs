//! HTTP client response handling.
//!
//! verdict turns raw HTTP outcomes into typed results: it decodes bodies by
//! [`Target`], applies `code` / `message` / `data` [`Envelope`] semantics,
//! classifies failures into a fixed [`ErrorKind`] taxonomy and shows a
//! loading [`Indicator`] for the lifetime of each [`Call`].
//!
//! # Example
//!
//! ```ignore
//! use verdict::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! pub struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let client = HyperClient::new();
//! let handler = Handler::headless();
//!
//! let uri = "https://api.example.com/users/1";
//! match client.get::<_, User>(&handler, None, uri, Target::EnvelopedModel).await {
//!     Ok(decoded) => println!("{:?}", decoded.and_then(Decoded::into_model)),
//!     Err(err) if err.is_token_expired() => sign_in(),
//!     Err(err) => show_toast(err.message()),
//! }
//! ```

mod client;
mod config;
mod connector;
pub mod prelude;

pub use client::{HyperClient, HyperClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use connector::https_connector;

// Re-export core types
pub use verdict_core::{
    Body, BodyStream, BoxError, Call, CallId, ConnectivityProbe, Decoded, DiagnosticSink,
    DynamicImage, Envelope, Error, ErrorKind, Handler, HandlerBuilder, HandlerConfig,
    HandlerConfigBuilder, Headless, Indicator, IndicatorFactory, Lifecycle, Messages, NoopIndicator,
    NullSink, ReauthHook, RequestHandler, Response, Result, SUCCESS_CODE, StaticProbe,
    TOKEN_EXPIRED_CODE, Target, TcpProbe, TracingSink, TransportError, classify, decode,
    is_cancelled_read, needs_connectivity,
};

// Re-export http types for status codes and headers
pub use verdict_core::{HeaderMap, StatusCode, header};
