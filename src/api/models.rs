use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use http::{HeaderMap, Method};

use crate::api::common::{pretty_json_response, read_upstream_json};
use crate::auth::extract_api_key;
use crate::error::ProxyError;
use crate::protocol::gemini::GeminiModelList;
use crate::protocol::openai_chat::{OpenAiModel, OpenAiModelList};
use crate::state::AppState;

/// `GET …/models`: the backend model list in `OpenAI` shape.
pub async fn handler(state: Arc<AppState>, headers: &HeaderMap) -> Response {
    match handle(&state, headers).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handle(state: &AppState, headers: &HeaderMap) -> Result<Response, ProxyError> {
    let url = state.upstream.models_url()?;
    let upstream_headers = state.upstream.request_headers(extract_api_key(headers));
    let response = state
        .transport
        .send_request(&url, Method::GET, &upstream_headers, None)
        .await?;
    let listing: GeminiModelList = read_upstream_json(response).await?;
    Ok(pretty_json_response(&to_openai_model_list(listing)))
}

fn to_openai_model_list(listing: GeminiModelList) -> OpenAiModelList {
    OpenAiModelList {
        object: "list",
        data: listing
            .models
            .into_iter()
            .map(|model| OpenAiModel {
                id: model.name.replacen("models/", "", 1),
                object: "model",
                created: 0,
                owned_by: "",
            })
            .collect(),
    }
}
