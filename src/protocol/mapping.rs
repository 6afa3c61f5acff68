use std::sync::Arc;

use crate::config::UpstreamConfig;

use super::gemini::{GeminiSafetySetting, GeminiUsageMetadata};
use super::openai_chat::OpenAiUsage;

/// Joins the text parts of one candidate into a single content string.
pub const CONTENT_PART_SEPARATOR: &str = "\n\n|>";

/// Finish reason used when a stream ends before a candidate reported one.
pub const FORCED_FINISH_REASON: &str = "stop";

// ---------------------------------------------------------------------------
// Finish reasons
// ---------------------------------------------------------------------------

/// Gemini `finishReason` to `OpenAI` `finish_reason` table.
///
/// Values absent from the table are passed through unchanged. An empty or
/// blank reason maps to [`FORCED_FINISH_REASON`], so the result is never empty.
#[derive(Debug, Clone)]
pub struct FinishReasonMap {
    entries: Vec<(String, String)>,
}

impl FinishReasonMap {
    #[must_use]
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn map<'a>(&'a self, reason: &'a str) -> &'a str {
        if reason.trim().is_empty() {
            return FORCED_FINISH_REASON;
        }
        self.entries
            .iter()
            .find(|(from, _)| from == reason)
            .map_or(reason, |(_, to)| to.as_str())
    }
}

impl Default for FinishReasonMap {
    fn default() -> Self {
        Self::new(
            [
                ("STOP", "stop"),
                ("MAX_TOKENS", "length"),
                ("SAFETY", "content_filter"),
                ("RECITATION", "content_filter"),
            ]
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Translation tables
// ---------------------------------------------------------------------------

/// Immutable lookup data shared by the request and response mappers.
#[derive(Debug, Clone)]
pub struct TranslationTables {
    pub finish_reasons: Arc<FinishReasonMap>,
    pub safety_settings: Vec<GeminiSafetySetting>,
}

impl TranslationTables {
    #[must_use]
    pub fn from_upstream(upstream: &UpstreamConfig) -> Self {
        let safety_settings = upstream
            .harm_categories
            .iter()
            .map(|category| GeminiSafetySetting {
                category: category.clone(),
                threshold: upstream.safety_threshold.clone(),
            })
            .collect();
        Self {
            finish_reasons: Arc::new(FinishReasonMap::default()),
            safety_settings,
        }
    }
}

impl Default for TranslationTables {
    fn default() -> Self {
        Self::from_upstream(&UpstreamConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Model selection
// ---------------------------------------------------------------------------

/// Pick the Gemini model for a chat request.
///
/// `models/x` becomes `x`; names carrying one of the configured prefixes are
/// used as-is; anything else (including a missing or non-string model) falls
/// back to the configured default.
#[must_use]
pub fn select_chat_model(requested: Option<&str>, upstream: &UpstreamConfig) -> String {
    let Some(requested) = requested else {
        return upstream.default_model.clone();
    };
    if let Some(stripped) = requested.strip_prefix("models/") {
        return stripped.to_string();
    }
    if upstream
        .model_prefixes
        .iter()
        .any(|prefix| requested.starts_with(prefix.as_str()))
    {
        return requested.to_string();
    }
    upstream.default_model.clone()
}

/// Pick the Gemini model for an embeddings request. Only fully-qualified
/// `models/x` names are forwarded.
#[must_use]
pub fn select_embeddings_model(requested: &str, upstream: &UpstreamConfig) -> String {
    if requested.starts_with("models/") {
        requested.to_string()
    } else {
        format!("models/{}", upstream.default_embeddings_model)
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Role of a non-system `OpenAI` message in Gemini `contents`.
#[must_use]
pub fn openai_role_to_gemini(role: &str) -> &'static str {
    match role {
        "assistant" => "model",
        _ => "user",
    }
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

#[must_use]
pub fn gemini_usage_to_openai(usage: &GeminiUsageMetadata) -> OpenAiUsage {
    OpenAiUsage {
        completion_tokens: usage.candidates_token_count,
        prompt_tokens: usage.prompt_token_count,
        total_tokens: usage.total_token_count,
    }
}
