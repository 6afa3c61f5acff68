use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use http::header;

use crate::api::{chat_completions, embeddings, models};
use crate::error::ProxyError;
use crate::state::AppState;

const METHOD_NOT_ALLOWED_MESSAGE: &str =
    "The specified HTTP method is not allowed for the requested resource";
const NOT_FOUND_MESSAGE: &str = "404 Not Found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteMatch {
    Preflight,
    ChatCompletions,
    Embeddings,
    Models,
    MethodNotAllowed,
    NotFound,
}

/// Dispatch a raw HTTP request to the matching handler. Every response
/// carries `Access-Control-Allow-Origin: *`.
///
/// # Errors
///
/// This function currently never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, body) = request.into_parts();
    let route = match_route(&parts.method, parts.uri.path());
    tracing::debug!(method = %parts.method, path = parts.uri.path(), ?route, "dispatching request");

    let mut response = match route {
        RouteMatch::Preflight => preflight_response(),
        RouteMatch::ChatCompletions => {
            match read_request_body(body, state.config.server.max_request_body_bytes).await {
                Ok(bytes) => chat_completions::handler(state, &parts.headers, bytes).await,
                Err(response) => response,
            }
        }
        RouteMatch::Embeddings => {
            match read_request_body(body, state.config.server.max_request_body_bytes).await {
                Ok(bytes) => embeddings::handler(state, &parts.headers, bytes).await,
                Err(response) => response,
            }
        }
        RouteMatch::Models => models::handler(state, &parts.headers).await,
        RouteMatch::MethodNotAllowed => {
            ProxyError::InvalidRequest(METHOD_NOT_ALLOWED_MESSAGE.into()).into_response()
        }
        RouteMatch::NotFound => ProxyError::NotFound(NOT_FOUND_MESSAGE.into()).into_response(),
    };

    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    Ok(response)
}

async fn read_request_body(body: Body, limit: usize) -> Result<bytes::Bytes, Response> {
    body::to_bytes(body, limit).await.map_err(|_| {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Request body too large (max {limit} bytes)"),
        )
            .into_response()
    })
}

fn preflight_response() -> Response {
    (
        StatusCode::OK,
        [
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("*"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("*"),
            ),
        ],
    )
        .into_response()
}

/// Routes match on path suffix so any prefix (`/v1`, `/openai/v1`, …) works.
fn match_route(method: &Method, path: &str) -> RouteMatch {
    if method == Method::OPTIONS {
        return RouteMatch::Preflight;
    }

    let (route, expected) = if path.ends_with("/chat/completions") {
        (RouteMatch::ChatCompletions, Method::POST)
    } else if path.ends_with("/embeddings") {
        (RouteMatch::Embeddings, Method::POST)
    } else if path.ends_with("/models") {
        (RouteMatch::Models, Method::GET)
    } else {
        return RouteMatch::NotFound;
    };

    if *method == expected {
        route
    } else {
        RouteMatch::MethodNotAllowed
    }
}
