use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ProxyError;
use crate::transport::error_for_upstream_status;

/// Parse a client request body.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidRequest`] when the body is not valid JSON for `T`.
pub(crate) fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProxyError> {
    serde_json::from_slice(body)
        .map_err(|err| ProxyError::InvalidRequest(format!("Invalid JSON body: {err}")))
}

/// Forward non-2xx backend responses and decode a successful JSON body.
///
/// # Errors
///
/// Returns [`ProxyError::Upstream`] for backend errors, or
/// [`ProxyError::Internal`] when a successful body does not decode.
pub(crate) async fn read_upstream_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProxyError> {
    let response = error_for_upstream_status(response).await?;
    let body = response
        .bytes()
        .await
        .map_err(|err| ProxyError::Transport(err.to_string()))?;
    serde_json::from_slice(&body).map_err(|err| {
        ProxyError::Internal(format!("Failed to decode upstream response: {err}"))
    })
}

pub(crate) fn json_response<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => bytes_json_response(Bytes::from(body)),
        Err(err) => ProxyError::Internal(format!("Failed to encode response: {err}")).into_response(),
    }
}

/// Two-space indented JSON, as served by the embeddings and model list routes.
pub(crate) fn pretty_json_response<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec_pretty(value) {
        Ok(body) => bytes_json_response(Bytes::from(body)),
        Err(err) => ProxyError::Internal(format!("Failed to encode response: {err}")).into_response(),
    }
}

fn bytes_json_response(body: Bytes) -> Response {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        Body::from(body),
    )
        .into_response()
}

pub(crate) fn sse_response(body: Body) -> Response {
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/event-stream"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
        ],
        body,
    )
        .into_response()
}
