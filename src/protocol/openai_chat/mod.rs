pub mod response_encoder;
pub mod stream;

use serde::{Deserialize, Serialize};

/// `OpenAI` Chat Completion request wire type.
///
/// `model` stays untyped: a missing or non-string model selects the default
/// backend model instead of failing the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiChatRequest {
    #[serde(default)]
    pub model: Option<serde_json::Value>,
    #[serde(default)]
    pub messages: Vec<OpenAiMessage>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub stream_options: Option<OpenAiStreamOptions>,
    #[serde(default)]
    pub stop: Option<OpenAiStop>,
    #[serde(default)]
    pub n: Option<u32>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default)]
    pub max_completion_tokens: Option<u64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub frequency_penalty: Option<f64>,
    #[serde(default)]
    pub presence_penalty: Option<f64>,
    #[serde(default)]
    pub response_format: Option<OpenAiResponseFormat>,
}

impl OpenAiChatRequest {
    #[must_use]
    pub fn model_str(&self) -> Option<&str> {
        self.model.as_ref().and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn is_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }

    #[must_use]
    pub fn include_usage(&self) -> bool {
        self.stream_options
            .as_ref()
            .and_then(|o| o.include_usage)
            .unwrap_or(false)
    }
}

/// `stop` field in `OpenAI` Chat requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenAiStop {
    Single(String),
    Multi(Vec<String>),
}

impl OpenAiStop {
    #[must_use]
    pub fn into_sequences(self) -> Vec<String> {
        match self {
            OpenAiStop::Single(s) => vec![s],
            OpenAiStop::Multi(v) => v,
        }
    }
}

/// Stream options for `include_usage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiStreamOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_usage: Option<bool>,
}

/// `response_format` request field.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub json_schema: Option<OpenAiJsonSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiJsonSchema {
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
}

/// `OpenAI` request message.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<OpenAiMessageContent>,
}

/// Message content: a plain string or a list of typed parts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OpenAiMessageContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

/// One typed content part. Only the field matching `type` is read.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiContentPart {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<OpenAiImageUrl>,
    #[serde(default)]
    pub input_audio: Option<OpenAiInputAudio>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiInputAudio {
    pub data: String,
    pub format: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Non-streaming `chat.completion` response.
#[derive(Debug, Clone, Serialize)]
pub struct OpenAiChatCompletion {
    pub id: String,
    pub choices: Vec<OpenAiChoice>,
    pub created: u64,
    pub model: String,
    pub object: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenAiUsage>,
}

/// A single choice in the response.
#[derive(Debug, Clone, Serialize)]
pub struct OpenAiChoice {
    pub index: u32,
    pub message: OpenAiResponseMessage,
    pub logprobs: Option<serde_json::Value>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiResponseMessage {
    pub role: &'static str,
    pub content: String,
}

/// Usage info, copied field-for-field from the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiEmbeddingsRequest {
    #[serde(default)]
    pub model: Option<serde_json::Value>,
    #[serde(default)]
    pub input: Option<OpenAiEmbeddingInput>,
    #[serde(default)]
    pub dimensions: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OpenAiEmbeddingInput {
    Single(String),
    Multi(Vec<String>),
}

impl OpenAiEmbeddingInput {
    #[must_use]
    pub fn into_texts(self) -> Vec<String> {
        match self {
            OpenAiEmbeddingInput::Single(s) => vec![s],
            OpenAiEmbeddingInput::Multi(v) => v,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiEmbeddingsResponse {
    pub object: &'static str,
    pub data: Vec<OpenAiEmbedding>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiEmbedding {
    pub object: &'static str,
    pub index: usize,
    pub embedding: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiModelList {
    pub object: &'static str,
    pub data: Vec<OpenAiModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiModel {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub owned_by: &'static str,
}
