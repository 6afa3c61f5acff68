use crate::protocol::gemini::GeminiResponse;
use crate::protocol::mapping::{gemini_usage_to_openai, FinishReasonMap};

use super::{OpenAiChatCompletion, OpenAiChoice, OpenAiResponseMessage};

/// Encode a Gemini generateContent response into a `chat.completion` body.
#[must_use]
pub fn encode_chat_completion(
    response: &GeminiResponse,
    model: &str,
    id: String,
    created: u64,
    finish_reasons: &FinishReasonMap,
) -> OpenAiChatCompletion {
    let choices = response
        .candidates
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|candidate| OpenAiChoice {
            index: candidate.index(),
            message: OpenAiResponseMessage {
                role: "assistant",
                content: candidate.joined_text(),
            },
            logprobs: None,
            finish_reason: candidate
                .finish_reason
                .as_deref()
                .map(|reason| finish_reasons.map(reason).to_string()),
        })
        .collect();

    OpenAiChatCompletion {
        id,
        choices,
        created,
        model: model.to_string(),
        object: "chat.completion",
        usage: response.usage_metadata.as_ref().map(gemini_usage_to_openai),
    }
}
