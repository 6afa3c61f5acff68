use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::api::common::{parse_json_body, pretty_json_response, read_upstream_json};
use crate::auth::extract_api_key;
use crate::error::ProxyError;
use crate::protocol::gemini::{
    GeminiBatchEmbedRequest, GeminiBatchEmbedResponse, GeminiContent, GeminiEmbedRequest,
    GeminiPart,
};
use crate::protocol::mapping::select_embeddings_model;
use crate::protocol::openai_chat::{
    OpenAiEmbedding, OpenAiEmbeddingsRequest, OpenAiEmbeddingsResponse,
};
use crate::state::AppState;

/// `POST …/embeddings`.
pub async fn handler(state: Arc<AppState>, headers: &HeaderMap, body: Bytes) -> Response {
    match handle(&state, headers, &body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handle(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<Response, ProxyError> {
    let request: OpenAiEmbeddingsRequest = parse_json_body(body)?;
    let Some(requested) = request.model.as_ref().and_then(serde_json::Value::as_str) else {
        return Err(ProxyError::InvalidRequest("model is not specified".into()));
    };
    let Some(input) = request.input else {
        return Err(ProxyError::InvalidRequest("input is not specified".into()));
    };

    let upstream_model = select_embeddings_model(requested, &state.config.upstream);
    let reported_model = if requested.starts_with("models/") {
        requested.to_string()
    } else {
        state.config.upstream.default_embeddings_model.clone()
    };
    tracing::info!(model = %upstream_model, "embeddings request");

    let batch = GeminiBatchEmbedRequest {
        requests: input
            .into_texts()
            .into_iter()
            .map(|text| GeminiEmbedRequest {
                model: upstream_model.clone(),
                content: GeminiContent {
                    role: None,
                    parts: vec![GeminiPart::text(text)],
                },
                output_dimensionality: request.dimensions,
            })
            .collect(),
    };
    let payload = serde_json::to_vec(&batch)
        .map_err(|err| ProxyError::Internal(format!("Failed to encode upstream request: {err}")))?;

    let url = state.upstream.batch_embed_url(&upstream_model)?;
    let upstream_headers = state
        .upstream
        .json_request_headers(extract_api_key(headers));
    let response = state
        .transport
        .send_request(&url, Method::POST, &upstream_headers, Some(Bytes::from(payload)))
        .await?;

    let embedded: GeminiBatchEmbedResponse = read_upstream_json(response).await?;
    let body = OpenAiEmbeddingsResponse {
        object: "list",
        data: embedded
            .embeddings
            .into_iter()
            .enumerate()
            .map(|(index, embedding)| OpenAiEmbedding {
                object: "embedding",
                index,
                embedding: embedding.values,
            })
            .collect(),
        model: reported_model,
    };
    Ok(pretty_json_response(&body))
}
