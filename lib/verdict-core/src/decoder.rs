//! Response decoding.
//!
//! [`decode`] turns a [`Response`] into the value a [`Target`] asks for,
//! applying envelope semantics to typed models.

use bytes::Bytes;
use image::DynamicImage;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::response::is_cancelled_read;
use crate::{
    Decoded, DiagnosticSink, Envelope, Error, Messages, Response, Result, SUCCESS_CODE, Target,
    TOKEN_EXPIRED_CODE,
};

/// Decode a response into `target`.
///
/// Returns `Ok(None)` when the response has no body, whatever the target.
///
/// # Errors
///
/// - [`Error::ResponseUnsuccessful`] for a non-2xx status, carrying the response.
/// - [`Error::DataDecode`] when the body cannot be read, is not UTF-8 where
///   text is needed, or does not parse into the target.
/// - [`Error::Cancelled`] when the body read is aborted by the call.
/// - [`Error::TokenExpired`] / [`Error::ResultFailure`] for a
///   [`Target::EnvelopedModel`] envelope whose code is `1001` / neither `0`
///   nor `1001`.
pub async fn decode<T: DeserializeOwned>(
    response: Response,
    target: Target,
    messages: &Messages,
    sink: &dyn DiagnosticSink,
) -> Result<Option<Decoded<T>>> {
    if !response.is_success() {
        return Err(Error::ResponseUnsuccessful {
            message: messages.server.clone(),
            response: Box::new(response),
        });
    }

    if response.body().is_none() {
        return Ok(None);
    }

    let decoded = match target {
        Target::RawResponse => Decoded::Response(response),
        Target::BinaryImage => {
            let bytes = read_body(response, messages).await?;
            Decoded::Image(decode_image(&bytes, messages)?)
        }
        Target::PlainText => Decoded::Text(read_text(response, messages, sink).await?),
        Target::JsonObject => {
            let text = read_text(response, messages, sink).await?;
            Decoded::Object(parse_json(&text, messages)?)
        }
        Target::JsonArray => {
            let text = read_text(response, messages, sink).await?;
            Decoded::Array(parse_json(&text, messages)?)
        }
        Target::Model => {
            let text = read_text(response, messages, sink).await?;
            Decoded::Model(decode_document(&text, messages)?)
        }
        Target::EnvelopedModel => {
            let text = read_text(response, messages, sink).await?;
            decode_enveloped(&text, messages)?
        }
    };

    Ok(Some(decoded))
}

async fn read_body(response: Response, messages: &Messages) -> Result<Bytes> {
    let Some(body) = response.into_body() else {
        return Ok(Bytes::new());
    };

    body.bytes().await.map_err(|err| {
        if is_cancelled_read(&err) {
            Error::cancelled(messages.cancelled.clone(), err)
        } else {
            Error::data_decode(messages.data_decode.clone(), err)
        }
    })
}

async fn read_text(
    response: Response,
    messages: &Messages,
    sink: &dyn DiagnosticSink,
) -> Result<String> {
    let bytes = read_body(response, messages).await?;
    let text = String::from_utf8(bytes.to_vec())
        .map_err(|err| Error::data_decode(messages.data_decode.clone(), err))?;
    sink.log_json(&text);
    Ok(text)
}

fn decode_image(bytes: &[u8], messages: &Messages) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|err| Error::data_decode(messages.data_decode.clone(), err))
}

fn parse_json<T: DeserializeOwned>(text: &str, messages: &Messages) -> Result<T> {
    serde_json::from_str(text).map_err(|err| Error::data_decode(messages.data_decode.clone(), err))
}

fn decode_document<T: DeserializeOwned>(text: &str, messages: &Messages) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|err| Error::data_decode(messages.data_decode.clone(), err))
}

fn decode_enveloped<T: DeserializeOwned>(text: &str, messages: &Messages) -> Result<Decoded<T>> {
    let value: Value = parse_json(text, messages)?;

    let Ok(envelope) = Envelope::from_value(value) else {
        return decode_document(text, messages).map(Decoded::Model);
    };

    match envelope.code {
        // `T` may be the envelope type itself, so retry on the whole document.
        SUCCESS_CODE => match envelope.decode_data() {
            Ok(envelope) => Ok(Decoded::Envelope(envelope)),
            Err(err) => decode_document(text, messages)
                .map(Decoded::Model)
                .map_err(|_| Error::data_decode(messages.data_decode.clone(), err)),
        },
        TOKEN_EXPIRED_CODE => Err(Error::TokenExpired {
            message: envelope.message,
        }),
        _ => Err(Error::ResultFailure {
            message: envelope.message.clone(),
            envelope,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use assert2::{check, let_assert};
    use bytes::Bytes;
    use futures_util::stream;
    use http::{HeaderMap, StatusCode};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::{Body, ErrorKind, NullSink};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Item {
        id: u32,
    }

    #[derive(Default)]
    struct RecordingSink {
        json: Mutex<Vec<String>>,
    }

    impl DiagnosticSink for RecordingSink {
        fn log_json(&self, text: &str) {
            self.json.lock().expect("lock").push(text.to_string());
        }

        fn log_error(&self, _error: &Error) {}
    }

    fn ok(body: impl Into<Body>) -> Response {
        Response::new(StatusCode::OK, HeaderMap::new(), Some(body.into()))
    }

    async fn run<T: DeserializeOwned>(
        response: Response,
        target: Target,
    ) -> Result<Option<Decoded<T>>> {
        decode(response, target, &Messages::default(), &NullSink).await
    }

    const ALL_TARGETS: [Target; 7] = [
        Target::RawResponse,
        Target::BinaryImage,
        Target::PlainText,
        Target::JsonObject,
        Target::JsonArray,
        Target::Model,
        Target::EnvelopedModel,
    ];

    #[tokio::test]
    async fn unsuccessful_status_for_every_target() {
        for target in ALL_TARGETS {
            let response = Response::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                HeaderMap::new(),
                Some(Body::full(r#"{"code":0,"message":"ok","data":{"id":7}}"#)),
            );
            let err = run::<Item>(response, target).await.expect_err("should fail");

            check!(err.kind() == ErrorKind::ResponseUnsuccessful);
            check!(err.status() == Some(StatusCode::INTERNAL_SERVER_ERROR));
        }
    }

    #[tokio::test]
    async fn unsuccessful_response_keeps_body_unread() {
        let response = Response::new(
            StatusCode::NOT_FOUND,
            HeaderMap::new(),
            Some(Body::full("missing")),
        );
        let err = run::<Item>(response, Target::PlainText).await.expect_err("should fail");

        let response = err.into_response().expect("response");
        let body = response.into_body().expect("body").bytes().await.expect("bytes");
        assert_eq!(body.as_ref(), b"missing");
    }

    #[tokio::test]
    async fn absent_body_is_empty_for_every_target() {
        for target in ALL_TARGETS {
            let response = Response::new(StatusCode::OK, HeaderMap::new(), None);
            let decoded = run::<Item>(response, target).await.expect("decode");
            check!(decoded.is_none());
        }
    }

    #[tokio::test]
    async fn raw_response_is_not_read() {
        let sink = RecordingSink::default();
        let body = Body::from_stream(stream::iter(vec![Ok(Bytes::from("raw"))]));
        let response = ok(body);

        let decoded = decode::<Item>(response, Target::RawResponse, &Messages::default(), &sink)
            .await
            .expect("decode")
            .expect("value");

        let response = decoded.into_response().expect("response");
        let body = response.into_body().expect("body");
        assert!(body.is_streaming());
        assert!(sink.json.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn plain_text() {
        let sink = RecordingSink::default();
        let decoded = decode::<Item>(ok("hello"), Target::PlainText, &Messages::default(), &sink)
            .await
            .expect("decode")
            .expect("value");

        assert_eq!(decoded.into_text().as_deref(), Some("hello"));
        assert_eq!(*sink.json.lock().expect("lock"), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_data_decode() {
        let err = run::<Item>(ok(vec![0xff, 0xfe]), Target::PlainText)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::DataDecode);
    }

    #[tokio::test]
    async fn truncated_body_is_data_decode() {
        let chunks = vec![
            Ok(Bytes::from("{\"id\":")),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
        ];
        let err = run::<Item>(ok(Body::from_stream(stream::iter(chunks))), Target::Model)
            .await
            .expect_err("should fail");

        assert_eq!(err.kind(), ErrorKind::DataDecode);
        let source = std::error::Error::source(&err).expect("source");
        let io_err = source.downcast_ref::<io::Error>().expect("io error");
        assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn cancelled_read_is_cancelled() {
        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();
        let body = Body::full("{}").with_cancellation(token);

        let err = run::<Item>(ok(body), Target::Model).await.expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.is_user_cancelled());
    }

    #[tokio::test]
    async fn json_object() {
        let decoded = run::<Item>(ok(r#"{"name":"widget","tags":[1,2]}"#), Target::JsonObject)
            .await
            .expect("decode")
            .expect("value");

        let object = decoded.into_object().expect("object");
        assert_eq!(object.get("name"), Some(&json!("widget")));
    }

    #[tokio::test]
    async fn not_json_object_is_data_decode() {
        let err = run::<Item>(ok("not json"), Target::JsonObject)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::DataDecode);

        let err = run::<Item>(ok("[1,2,3]"), Target::JsonObject)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::DataDecode);
    }

    #[tokio::test]
    async fn json_array() {
        let decoded = run::<Item>(ok("[1,2,3]"), Target::JsonArray)
            .await
            .expect("decode")
            .expect("value");
        assert_eq!(decoded.into_array(), Some(vec![json!(1), json!(2), json!(3)]));

        let err = run::<Item>(ok(r#"{"a":1}"#), Target::JsonArray)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::DataDecode);
    }

    #[tokio::test]
    async fn envelope_success_yields_model() {
        let body = r#"{"code":0,"message":"ok","data":{"id":7}}"#;
        let decoded = run::<Item>(ok(body), Target::EnvelopedModel)
            .await
            .expect("decode")
            .expect("value");

        let envelope = decoded.envelope().expect("envelope");
        assert_eq!(envelope.message, "ok");
        assert_eq!(decoded.into_model(), Some(Item { id: 7 }));
    }

    #[tokio::test]
    async fn envelope_round_trip() {
        let original = Envelope {
            code: 0,
            message: String::new(),
            data: Item { id: 42 },
        };
        let body = serde_json::to_string(&original).expect("serialize");

        let decoded = run::<Item>(ok(body), Target::EnvelopedModel)
            .await
            .expect("decode")
            .expect("value");
        assert_eq!(decoded.into_envelope(), Some(original));
    }

    #[tokio::test]
    async fn envelope_token_expired() {
        let body = r#"{"code":1001,"message":"please sign in again","data":null}"#;
        let err = run::<Item>(ok(body), Target::EnvelopedModel).await.expect_err("should fail");

        let_assert!(Error::TokenExpired { message } = err);
        check!(message == "please sign in again");
    }

    #[tokio::test]
    async fn envelope_result_failure() {
        for code in [-1, 1, 500, 1000, 1002] {
            let body = json!({
                "code": code,
                "message": format!("failed with {code}"),
                "data": {"hint": "retry"},
            });
            let err = run::<Item>(ok(body.to_string()), Target::EnvelopedModel)
                .await
                .expect_err("should fail");

            check!(err.kind() == ErrorKind::ResultFailure);
            check!(err.code() == Some(code));
            check!(err.message() == format!("failed with {code}"));
            let envelope = err.envelope().expect("envelope");
            check!(envelope.data == json!({"hint": "retry"}));
        }
    }

    #[tokio::test]
    async fn plain_model_without_envelope() {
        let decoded = run::<Item>(ok(r#"{"id":3}"#), Target::Model)
            .await
            .expect("decode")
            .expect("value");

        assert!(decoded.envelope().is_none());
        assert_eq!(decoded.into_model(), Some(Item { id: 3 }));
    }

    #[tokio::test]
    async fn enveloped_target_accepts_plain_document() {
        let decoded = run::<Item>(ok(r#"{"id":3}"#), Target::EnvelopedModel)
            .await
            .expect("decode")
            .expect("value");

        assert!(decoded.envelope().is_none());
        assert_eq!(decoded.into_model(), Some(Item { id: 3 }));
    }

    #[tokio::test]
    async fn envelope_type_as_model() {
        let body = r#"{"code":0,"message":"ok","data":{"id":7}}"#;
        let decoded = run::<Envelope<Item>>(ok(body), Target::EnvelopedModel)
            .await
            .expect("decode")
            .expect("value");

        let expected = Envelope {
            code: 0,
            message: "ok".to_string(),
            data: Item { id: 7 },
        };
        assert_eq!(decoded.into_model(), Some(expected));
    }

    #[tokio::test]
    async fn envelope_type_as_model_still_checks_code() {
        let body = r#"{"code":7,"message":"denied","data":{"id":7}}"#;
        let err = run::<Envelope<Item>>(ok(body), Target::EnvelopedModel)
            .await
            .expect_err("should fail");
        check!(err.kind() == ErrorKind::ResultFailure);
        check!(err.code() == Some(7));
    }

    #[tokio::test]
    async fn plain_model_with_code_and_message_is_kept() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Status {
            code: i64,
            message: String,
        }

        let decoded = run::<Status>(ok(r#"{"code":3,"message":"degraded"}"#), Target::Model)
            .await
            .expect("decode")
            .expect("value");

        let expected = Status {
            code: 3,
            message: "degraded".to_string(),
        };
        assert!(decoded.envelope().is_none());
        assert_eq!(decoded.into_model(), Some(expected));
    }

    #[tokio::test]
    async fn model_syntax_error_is_data_decode() {
        let err = run::<Item>(ok("{\"id\":"), Target::Model)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::DataDecode);
    }

    #[tokio::test]
    async fn model_shape_mismatch_is_data_decode() {
        let body = r#"{"code":0,"message":"ok","data":{"id":"seven"}}"#;
        let err = run::<Item>(ok(body), Target::EnvelopedModel)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::DataDecode);
        let source = std::error::Error::source(&err).expect("source");
        check!(source.to_string().starts_with("id"));

        let err = run::<Item>(ok(r#"{"name":"widget"}"#), Target::Model)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::DataDecode);
    }

    #[tokio::test]
    async fn image() {
        let mut png = std::io::Cursor::new(Vec::new());
        image::RgbImage::new(2, 3)
            .write_to(&mut png, image::ImageFormat::Png)
            .expect("encode");

        let decoded = run::<Item>(ok(png.into_inner()), Target::BinaryImage)
            .await
            .expect("decode")
            .expect("value");

        let image = decoded.into_image().expect("image");
        assert_eq!((image.width(), image.height()), (2, 3));
    }

    #[tokio::test]
    async fn not_an_image_is_data_decode() {
        let err = run::<Item>(ok("definitely not a png"), Target::BinaryImage)
            .await
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::DataDecode);
    }
}
