//! Prelude module for convenient imports.
//!
//! ```ignore
//! use verdict::prelude::*;
//! ```

pub use crate::{
    Call, ClientConfig, Decoded, Envelope, Error, ErrorKind, Handler, HandlerConfig, HyperClient,
    Indicator, IndicatorFactory, RequestHandler, Response, Result, StatusCode, Target, header,
};
pub use serde::Deserialize;
