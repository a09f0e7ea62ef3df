//! Custom extractors for the HTTP server.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Rejection type for `MsgPackExtractor`
#[derive(Debug)]
pub struct MsgPackRejection {
    message: String,
}

impl IntoResponse for MsgPackRejection {
    fn into_response(self) -> Response {
        let body = crate::error::ErrorResponse {
            error: crate::error::ErrorDetail {
                code: "DESERIALIZATION_ERROR",
                message: self.message.clone(),
            },
        };

        match rmp_serde::to_vec_named(&body) {
            Ok(bytes) => (
                StatusCode::BAD_REQUEST,
                [("content-type", "application/msgpack")],
                bytes,
            )
                .into_response(),
            Err(_) => (StatusCode::BAD_REQUEST, self.message).into_response(),
        }
    }
}

/// Body encodings the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    MsgPack,
    Json,
}

fn body_format(content_type: &str) -> Option<BodyFormat> {
    if content_type.is_empty() || content_type.contains("msgpack") {
        Some(BodyFormat::MsgPack)
    } else if content_type.contains("json") {
        Some(BodyFormat::Json)
    } else {
        None
    }
}

/// Extractor for `MessagePack` request bodies.
///
/// Accepts `application/msgpack` and `application/x-msgpack`. A missing
/// content type is treated as `MessagePack`; `application/json` bodies are
/// accepted as well so chat front ends can post plain JSON.
pub struct MsgPackExtractor<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for MsgPackExtractor<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = MsgPackRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let Some(format) = body_format(content_type) else {
            return Err(MsgPackRejection {
                message: format!(
                    "Invalid content type: expected application/msgpack, got {content_type}"
                ),
            });
        };

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| MsgPackRejection {
                message: format!("Failed to read request body: {e}"),
            })?;

        match format {
            BodyFormat::MsgPack => rmp_serde::from_slice(&bytes).map_err(|e| MsgPackRejection {
                message: format!("Failed to deserialize MessagePack: {e}"),
            }),
            BodyFormat::Json => serde_json::from_slice(&bytes).map_err(|e| MsgPackRejection {
                message: format!("Failed to deserialize JSON: {e}"),
            }),
        }
        .map(MsgPackExtractor)
    }
}
