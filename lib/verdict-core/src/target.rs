//! Decode targets and decoded values.

use image::DynamicImage;
use serde_json::{Map, Value};

use crate::{Envelope, Response};

/// The shape a caller wants extracted from a response body.
///
/// For [`Target::Model`] and [`Target::EnvelopedModel`] the model type is
/// the type parameter of [`decode`](crate::decode()).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// The response itself, body unread.
    RawResponse,
    /// A decoded image.
    BinaryImage,
    /// The body as UTF-8 text.
    PlainText,
    /// A generic JSON object.
    JsonObject,
    /// A generic JSON array.
    JsonArray,
    /// A typed model, decoded from the whole document.
    Model,
    /// A typed model whose document may be an [`Envelope`].
    ///
    /// Envelope codes decide success or failure. The model can itself be an
    /// envelope type such as `Envelope<Item>`.
    EnvelopedModel,
}

/// A successfully decoded body.
#[derive(Debug)]
pub enum Decoded<T> {
    /// [`Target::RawResponse`].
    Response(Response),
    /// [`Target::BinaryImage`].
    Image(DynamicImage),
    /// [`Target::PlainText`].
    Text(String),
    /// [`Target::JsonObject`].
    Object(Map<String, Value>),
    /// [`Target::JsonArray`].
    Array(Vec<Value>),
    /// A model decoded from the whole document.
    Model(T),
    /// [`Target::EnvelopedModel`], payload delivered in a successful envelope.
    Envelope(Envelope<T>),
}

impl<T> Decoded<T> {
    /// The model, unwrapping the envelope if there is one.
    #[must_use]
    pub fn into_model(self) -> Option<T> {
        match self {
            Self::Model(model) => Some(model),
            Self::Envelope(envelope) => Some(envelope.data),
            _ => None,
        }
    }

    /// The envelope, if the model came in one.
    #[must_use]
    pub const fn envelope(&self) -> Option<&Envelope<T>> {
        match self {
            Self::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// The envelope, if the model came in one.
    #[must_use]
    pub fn into_envelope(self) -> Option<Envelope<T>> {
        match self {
            Self::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// The text of a [`Target::PlainText`] decode.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The object of a [`Target::JsonObject`] decode.
    #[must_use]
    pub fn into_object(self) -> Option<Map<String, Value>> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The array of a [`Target::JsonArray`] decode.
    #[must_use]
    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    /// The image of a [`Target::BinaryImage`] decode.
    #[must_use]
    pub fn into_image(self) -> Option<DynamicImage> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    /// The response of a [`Target::RawResponse`] decode.
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Response(response) => Some(response),
            _ => None,
        }
    }
}
