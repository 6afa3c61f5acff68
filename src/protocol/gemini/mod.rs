pub mod encoder;

use serde::{Deserialize, Serialize};

use crate::protocol::mapping::CONTENT_PART_SEPARATOR;

/// Gemini v1beta generateContent request wire type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    #[serde(
        rename = "system_instruction",
        skip_serializing_if = "Option::is_none"
    )]
    pub system_instruction: Option<GeminiContent>,
    pub contents: Vec<GeminiContent>,
    pub safety_settings: Vec<GeminiSafetySetting>,
    pub generation_config: GeminiGenerationConfig,
}

/// A content message in Gemini format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A single part within a Gemini content message.
///
/// Parts the proxy does not understand (function calls, thoughts, code) still
/// deserialize; they simply carry neither field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiInlineData>,
}

impl GeminiPart {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    #[must_use]
    pub fn inline_data(data: GeminiInlineData) -> Self {
        Self {
            text: None,
            inline_data: Some(data),
        }
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }
}

/// Base64 payload embedded directly in a request part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiSafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Sampling and output options; every unset field is omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

/// Gemini generateContent response wire type. Also the payload of every
/// `streamGenerateContent?alt=sse` frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<GeminiCandidate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

/// A candidate in the response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<GeminiContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl GeminiCandidate {
    /// Candidate index; an absent index is index 0.
    #[inline]
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index.unwrap_or(0)
    }

    /// Text of all parts joined with [`CONTENT_PART_SEPARATOR`]. Non-text
    /// parts contribute an empty segment.
    #[must_use]
    pub fn joined_text(&self) -> String {
        let Some(content) = self.content.as_ref() else {
            return String::new();
        };
        let mut out = String::new();
        for (i, part) in content.parts.iter().enumerate() {
            if i > 0 {
                out.push_str(CONTENT_PART_SEPARATOR);
            }
            if let Some(text) = part.text.as_deref() {
                out.push_str(text);
            }
        }
        out
    }
}

/// Usage metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates_token_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<u64>,
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

/// `:batchEmbedContents` request body.
#[derive(Debug, Clone, Serialize)]
pub struct GeminiBatchEmbedRequest {
    pub requests: Vec<GeminiEmbedRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiEmbedRequest {
    pub model: String,
    pub content: GeminiContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dimensionality: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiBatchEmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<GeminiEmbedding>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiEmbedding {
    #[serde(default)]
    pub values: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Model listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiModelList {
    #[serde(default)]
    pub models: Vec<GeminiModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiModel {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_with_unknown_parts_deserializes() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"a"},{"functionCall":{"name":"f","args":{}}},{"text":"b"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":2,"totalTokenCount":5}}"#;
        let resp: GeminiResponse = serde_json::from_str(raw).unwrap();
        let cand = &resp.candidates.unwrap()[0];
        assert_eq!(cand.index(), 0);
        assert_eq!(cand.joined_text(), "a\n\n|>\n\n|>b");
        assert_eq!(cand.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_candidate_without_content() {
        let raw = r#"{"finishReason":"SAFETY","index":1}"#;
        let cand: GeminiCandidate = serde_json::from_str(raw).unwrap();
        assert_eq!(cand.index(), 1);
        assert_eq!(cand.joined_text(), "");
    }

    #[test]
    fn test_request_serializes_gemini_field_names() {
        let req = GeminiRequest {
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::text("be brief")],
            }),
            contents: vec![GeminiContent {
                role: Some("user".into()),
                parts: vec![GeminiPart::inline_data(GeminiInlineData {
                    mime_type: "image/png".into(),
                    data: "AAAA".into(),
                })],
            }],
            safety_settings: vec![GeminiSafetySetting {
                category: "HARM_CATEGORY_HARASSMENT".into(),
                threshold: "BLOCK_NONE".into(),
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: Some(64),
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["system_instruction"]["parts"][0]["text"], "be brief");
        assert_eq!(
            value["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(value["safetySettings"][0]["threshold"], "BLOCK_NONE");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 64);
        assert!(value["generationConfig"].get("temperature").is_none());
    }
}
