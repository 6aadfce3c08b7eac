//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use verdict_core::prelude::*;
//! ```

pub use crate::{
    Body, Call, ConnectivityProbe, Decoded, DiagnosticSink, Envelope, Error, ErrorKind, Handler,
    HandlerConfig, Indicator, IndicatorFactory, RequestHandler, Response, Result, Target,
    classify, decode,
};
