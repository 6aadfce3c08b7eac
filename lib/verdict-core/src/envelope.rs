//! Application-level response envelope.
//!
//! Many APIs wrap every payload as `{"code": 0, "message": "...", "data": ...}`.
//! The code tells success from failure independently of the HTTP status.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope code for a successful call.
pub const SUCCESS_CODE: i64 = 0;

/// Envelope code for an expired login.
pub const TOKEN_EXPIRED_CODE: i64 = 1001;

/// A `code` / `message` / `data` wrapper around a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    /// Application status code.
    pub code: i64,
    /// Message for the caller.
    pub message: String,
    /// Payload.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Code is [`SUCCESS_CODE`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Code is [`TOKEN_EXPIRED_CODE`].
    #[must_use]
    pub const fn is_token_expired(&self) -> bool {
        self.code == TOKEN_EXPIRED_CODE
    }

    /// Consume into the payload.
    #[must_use]
    pub fn into_data(self) -> T {
        self.data
    }
}

impl Envelope<Value> {
    /// Split a JSON document into an envelope if it has the envelope shape:
    /// an object with an integer `code` and a string `message`.
    ///
    /// A missing `data` becomes `null`. Documents of any other shape are
    /// handed back unchanged.
    pub fn from_value(value: Value) -> Result<Self, Value> {
        let Value::Object(mut map) = value else {
            return Err(value);
        };

        let code = map.get("code").and_then(Value::as_i64);
        let has_message = map.get("message").is_some_and(Value::is_string);
        let Some(code) = code.filter(|_| has_message) else {
            return Err(Value::Object(map));
        };

        let message = match map.remove("message") {
            Some(Value::String(message)) => message,
            _ => String::new(),
        };
        let data = map.remove("data").unwrap_or(Value::Null);

        Ok(Self {
            code,
            message,
            data,
        })
    }

    /// Deserialize the payload into `T`, keeping code and message.
    ///
    /// # Errors
    ///
    /// Returns the path-aware error if the payload does not match `T`.
    pub fn decode_data<T: DeserializeOwned>(
        self,
    ) -> Result<Envelope<T>, serde_path_to_error::Error<serde_json::Error>> {
        let data = serde_path_to_error::deserialize(self.data)?;
        Ok(Envelope {
            code: self.code,
            message: self.message,
            data,
        })
    }
}
