use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use openai_gemini::config::{AppConfig, ServerConfig, UpstreamConfig};
use openai_gemini::routing::dispatch::dispatch_request;
use openai_gemini::state::AppState;
use serde_json::json;

/// State pointing at a closed port; every case here is rejected before any
/// backend call.
fn offline_state(server: ServerConfig) -> Arc<AppState> {
    let config = AppConfig {
        server,
        upstream: UpstreamConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..UpstreamConfig::default()
        },
        ..AppConfig::default()
    };
    Arc::new(AppState::from_config(config))
}

fn request(method: &str, path: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(body)
        .expect("build request")
}

async fn send(request: Request<Body>) -> Response {
    dispatch_request(offline_state(ServerConfig::default()), request)
        .await
        .expect("dispatch")
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

fn chat_body(extra: serde_json::Value) -> Body {
    let mut body = json!({"messages": [{"role": "user", "content": "Hi"}]});
    if let (Some(target), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        target.extend(extra.clone());
    }
    Body::from(body.to_string())
}

#[tokio::test]
async fn test_options_preflight() {
    let response = send(request("OPTIONS", "/v1/chat/completions", Body::empty())).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["access-control-allow-methods"], "*");
    assert_eq!(response.headers()["access-control-allow-headers"], "*");
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let response = send(request("GET", "/v1/completions", Body::empty())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(body_text(response).await, "404 Not Found");
}

#[tokio::test]
async fn test_wrong_method_is_400() {
    for (method, path) in [
        ("GET", "/v1/chat/completions"),
        ("GET", "/v1/embeddings"),
        ("POST", "/v1/models"),
    ] {
        let response = send(request(method, path, Body::empty())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method} {path}");
        assert_eq!(
            body_text(response).await,
            "The specified HTTP method is not allowed for the requested resource"
        );
    }
}

#[tokio::test]
async fn test_invalid_json_body_is_400() {
    let response = send(request(
        "POST",
        "/v1/chat/completions",
        Body::from("{\"messages\": ["),
    ))
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_unsupported_response_format_is_400() {
    let response = send(request(
        "POST",
        "/v1/chat/completions",
        chat_body(json!({"response_format": {"type": "xml"}})),
    ))
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(body_text(response).await, "Unsupported response_format.type");
}

#[tokio::test]
async fn test_bad_content_parts_are_400() {
    let response = send(request(
        "POST",
        "/v1/chat/completions",
        Body::from(
            json!({"messages": [{"role": "user", "content": [{"type": "video", "video": {}}]}]})
                .to_string(),
        ),
    ))
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        "Unknown \"content\" item type: \"video\""
    );

    let response = send(request(
        "POST",
        "/v1/chat/completions",
        Body::from(
            json!({"messages": [{"role": "user", "content": [
                {"type": "image_url", "image_url": {"url": "not-a-data-uri"}}
            ]}]})
            .to_string(),
        ),
    ))
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Invalid image data: not-a-data-uri");
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let state = offline_state(ServerConfig {
        max_request_body_bytes: 16,
        ..ServerConfig::default()
    });
    let response = dispatch_request(
        state,
        request("POST", "/v1/chat/completions", chat_body(json!({}))),
    )
    .await
    .expect("dispatch");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_unreachable_backend_is_500() {
    let response = send(request("POST", "/v1/chat/completions", chat_body(json!({})))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
