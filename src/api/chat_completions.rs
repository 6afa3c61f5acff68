use std::sync::Arc;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::api::common::{json_response, parse_json_body, read_upstream_json, sse_response};
use crate::auth::extract_api_key;
use crate::error::ProxyError;
use crate::protocol::gemini::encoder::encode_gemini_request;
use crate::protocol::gemini::GeminiResponse;
use crate::protocol::mapping::select_chat_model;
use crate::protocol::openai_chat::response_encoder::encode_chat_completion;
use crate::protocol::openai_chat::OpenAiChatRequest;
use crate::state::AppState;
use crate::stream::{transcode_gemini_stream, StreamTranscoder};
use crate::transport::error_for_upstream_status;
use crate::util::{generate_chatcmpl_id, unix_now_secs};

/// `POST …/chat/completions`.
pub async fn handler(state: Arc<AppState>, headers: &HeaderMap, body: Bytes) -> Response {
    match handle(&state, headers, &body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handle(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<Response, ProxyError> {
    let request: OpenAiChatRequest = parse_json_body(body)?;
    let model = select_chat_model(request.model_str(), &state.config.upstream);
    let stream = request.is_stream();
    let include_usage = request.include_usage();
    tracing::info!(model = %model, stream, "chat completion request");

    let gemini_request = encode_gemini_request(request, &state.tables, &state.transport).await?;
    let payload = serde_json::to_vec(&gemini_request)
        .map_err(|err| ProxyError::Internal(format!("Failed to encode upstream request: {err}")))?;

    let url = state.upstream.generate_content_url(&model, stream)?;
    let upstream_headers = state
        .upstream
        .json_request_headers(extract_api_key(headers));
    let response = state
        .transport
        .send_request(&url, Method::POST, &upstream_headers, Some(Bytes::from(payload)))
        .await?;

    let id = generate_chatcmpl_id();
    if stream {
        let response = error_for_upstream_status(response).await?;
        let transcoder = StreamTranscoder::new(
            model,
            id,
            include_usage,
            Arc::clone(&state.tables.finish_reasons),
        );
        let body = Body::from_stream(transcode_gemini_stream(response.bytes_stream(), transcoder));
        return Ok(sse_response(body));
    }

    let gemini_response: GeminiResponse = read_upstream_json(response).await?;
    let completion = encode_chat_completion(
        &gemini_response,
        &model,
        id,
        unix_now_secs(),
        &state.tables.finish_reasons,
    );
    Ok(json_response(&completion))
}
