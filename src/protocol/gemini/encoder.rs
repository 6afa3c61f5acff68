use futures_util::future::try_join_all;

use crate::error::ProxyError;
use crate::protocol::gemini::{
    GeminiContent, GeminiGenerationConfig, GeminiInlineData, GeminiPart, GeminiRequest,
};
use crate::protocol::mapping::{openai_role_to_gemini, TranslationTables};
use crate::protocol::media::InlineDataResolver;
use crate::protocol::openai_chat::{
    OpenAiChatRequest, OpenAiContentPart, OpenAiMessage, OpenAiMessageContent,
    OpenAiResponseFormat,
};

/// Encode an `OpenAI` chat request into a Gemini generateContent request.
///
/// Options are validated before any image reference is fetched.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidRequest`] for an unsupported
/// `response_format.type`, an unknown content part type, or an image
/// reference that cannot be resolved.
pub async fn encode_gemini_request<R: InlineDataResolver>(
    request: OpenAiChatRequest,
    tables: &TranslationTables,
    resolver: &R,
) -> Result<GeminiRequest, ProxyError> {
    let generation_config = encode_generation_config(&request)?;

    let mut system_instruction = None;
    let mut contents = Vec::with_capacity(request.messages.len());
    for message in &request.messages {
        if message.role == "system" {
            // Last system message wins.
            system_instruction = Some(GeminiContent {
                role: None,
                parts: encode_parts(message, resolver).await?,
            });
        } else {
            contents.push(GeminiContent {
                role: Some(openai_role_to_gemini(&message.role).to_string()),
                parts: encode_parts(message, resolver).await?,
            });
        }
    }

    // Gemini rejects a request whose only content is the system instruction.
    if system_instruction.is_some() && contents.is_empty() {
        contents.push(GeminiContent {
            role: Some("model".to_string()),
            parts: vec![GeminiPart::text(" ")],
        });
    }

    Ok(GeminiRequest {
        system_instruction,
        contents,
        safety_settings: tables.safety_settings.clone(),
        generation_config,
    })
}

/// Map the flat `OpenAI` sampling options onto `generationConfig`.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidRequest`] for an unsupported
/// `response_format.type`.
pub fn encode_generation_config(
    request: &OpenAiChatRequest,
) -> Result<GeminiGenerationConfig, ProxyError> {
    let mut config = GeminiGenerationConfig {
        stop_sequences: request.stop.clone().map(|s| s.into_sequences()),
        candidate_count: request.n,
        max_output_tokens: request.max_completion_tokens.or(request.max_tokens),
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: request.top_k,
        frequency_penalty: request.frequency_penalty,
        presence_penalty: request.presence_penalty,
        ..GeminiGenerationConfig::default()
    };
    if let Some(format) = request.response_format.as_ref() {
        apply_response_format(&mut config, format)?;
    }
    Ok(config)
}

fn apply_response_format(
    config: &mut GeminiGenerationConfig,
    format: &OpenAiResponseFormat,
) -> Result<(), ProxyError> {
    let mime_type = match format.type_.as_str() {
        "json_schema" => {
            let schema = format.json_schema.as_ref().and_then(|s| s.schema.clone());
            let is_enum = schema
                .as_ref()
                .and_then(serde_json::Value::as_object)
                .is_some_and(|obj| obj.contains_key("enum"));
            config.response_schema = schema;
            if is_enum {
                "text/x.enum"
            } else {
                "application/json"
            }
        }
        "json_object" => "application/json",
        "text" => "text/plain",
        _ => {
            return Err(ProxyError::InvalidRequest(
                "Unsupported response_format.type".to_string(),
            ))
        }
    };
    config.response_mime_type = Some(mime_type.to_string());
    Ok(())
}

enum PendingPart<'a> {
    Ready(GeminiPart),
    Image(&'a str),
}

async fn encode_parts<R: InlineDataResolver>(
    message: &OpenAiMessage,
    resolver: &R,
) -> Result<Vec<GeminiPart>, ProxyError> {
    let items = match message.content.as_ref() {
        None => return Ok(vec![GeminiPart::text("")]),
        Some(OpenAiMessageContent::Text(text)) => return Ok(vec![GeminiPart::text(text.clone())]),
        Some(OpenAiMessageContent::Parts(items)) => items,
    };

    let pending = items
        .iter()
        .map(classify_part)
        .collect::<Result<Vec<_>, _>>()?;

    let mut parts = try_join_all(pending.into_iter().map(|part| async move {
        match part {
            PendingPart::Ready(part) => Ok(part),
            PendingPart::Image(url) => resolver.resolve(url).await.map(GeminiPart::inline_data),
        }
    }))
    .await?;

    if !parts.iter().any(GeminiPart::is_text) {
        parts.push(GeminiPart::text(""));
    }
    Ok(parts)
}

fn classify_part(item: &OpenAiContentPart) -> Result<PendingPart<'_>, ProxyError> {
    match item.type_.as_str() {
        "text" => Ok(PendingPart::Ready(GeminiPart::text(
            item.text.clone().unwrap_or_default(),
        ))),
        "image_url" => item
            .image_url
            .as_ref()
            .map(|image| PendingPart::Image(image.url.as_str()))
            .ok_or_else(|| missing_field("image_url")),
        "input_audio" => item
            .input_audio
            .as_ref()
            .map(|audio| {
                PendingPart::Ready(GeminiPart::inline_data(GeminiInlineData {
                    mime_type: format!("audio/{}", audio.format),
                    data: audio.data.clone(),
                }))
            })
            .ok_or_else(|| missing_field("input_audio")),
        other => Err(ProxyError::InvalidRequest(format!(
            "Unknown \"content\" item type: \"{other}\""
        ))),
    }
}

fn missing_field(field: &str) -> ProxyError {
    ProxyError::InvalidRequest(format!("Missing \"{field}\" in \"content\" item"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::media::parse_data_uri;

    struct DataUriOnly;

    impl InlineDataResolver for DataUriOnly {
        async fn resolve(&self, url: &str) -> Result<GeminiInlineData, ProxyError> {
            parse_data_uri(url)
        }
    }

    fn request(raw: serde_json::Value) -> OpenAiChatRequest {
        serde_json::from_value(raw).unwrap()
    }

    async fn encode(raw: serde_json::Value) -> Result<GeminiRequest, ProxyError> {
        encode_gemini_request(request(raw), &TranslationTables::default(), &DataUriOnly).await
    }

    #[tokio::test]
    async fn test_roles_and_system_instruction() {
        let encoded = encode(serde_json::json!({
            "messages": [
                {"role": "system", "content": "first"},
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "system", "content": "second"},
                {"role": "tool", "content": "result"}
            ]
        }))
        .await
        .unwrap();
        let system = encoded.system_instruction.unwrap();
        assert!(system.role.is_none());
        assert_eq!(system.parts, vec![GeminiPart::text("second")]);
        let roles: Vec<_> = encoded
            .contents
            .iter()
            .map(|c| c.role.as_deref().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(encoded.safety_settings.len(), 5);
    }

    #[tokio::test]
    async fn test_system_only_gets_model_placeholder() {
        let encoded = encode(serde_json::json!({
            "messages": [{"role": "system", "content": "rules"}]
        }))
        .await
        .unwrap();
        assert_eq!(encoded.contents.len(), 1);
        assert_eq!(encoded.contents[0].role.as_deref(), Some("model"));
        assert_eq!(encoded.contents[0].parts, vec![GeminiPart::text(" ")]);
    }

    #[tokio::test]
    async fn test_image_only_message_gets_empty_text_part() {
        let encoded = encode(serde_json::json!({
            "messages": [{"role": "user", "content": [
                {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,/9j/"}},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBO"}}
            ]}]
        }))
        .await
        .unwrap();
        let parts = &encoded.contents[0].parts;
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].inline_data.as_ref().unwrap().mime_type, "image/jpeg");
        assert_eq!(parts[1].inline_data.as_ref().unwrap().data, "iVBO");
        assert_eq!(parts[2], GeminiPart::text(""));
    }

    #[tokio::test]
    async fn test_text_and_audio_parts_keep_order() {
        let encoded = encode(serde_json::json!({
            "messages": [{"role": "user", "content": [
                {"type": "input_audio", "input_audio": {"data": "UklG", "format": "wav"}},
                {"type": "text", "text": "transcribe"}
            ]}]
        }))
        .await
        .unwrap();
        let parts = &encoded.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].inline_data.as_ref().unwrap().mime_type, "audio/wav");
        assert_eq!(parts[1], GeminiPart::text("transcribe"));
    }

    #[tokio::test]
    async fn test_null_content_is_empty_text() {
        let encoded = encode(serde_json::json!({
            "messages": [{"role": "assistant", "content": null}]
        }))
        .await
        .unwrap();
        assert_eq!(encoded.contents[0].parts, vec![GeminiPart::text("")]);
    }

    #[tokio::test]
    async fn test_unknown_part_type_rejected() {
        let err = encode(serde_json::json!({
            "messages": [{"role": "user", "content": [{"type": "video", "video": {}}]}]
        }))
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Unknown \"content\" item type: \"video\"");
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_generation_config_field_map() {
        let config = encode_generation_config(&request(serde_json::json!({
            "stop": ["a", "b"],
            "n": 2,
            "max_tokens": 10,
            "max_completion_tokens": 20,
            "temperature": 0.5,
            "top_p": 0.9,
            "top_k": 40,
            "frequency_penalty": 0.1,
            "presence_penalty": 0.2
        })))
        .unwrap();
        assert_eq!(config.stop_sequences, Some(vec!["a".into(), "b".into()]));
        assert_eq!(config.candidate_count, Some(2));
        assert_eq!(config.max_output_tokens, Some(20));
        assert_eq!(config.temperature, Some(0.5));
        assert_eq!(config.top_p, Some(0.9));
        assert_eq!(config.top_k, Some(40));
        assert_eq!(config.frequency_penalty, Some(0.1));
        assert_eq!(config.presence_penalty, Some(0.2));
        assert!(config.response_mime_type.is_none());
    }

    #[test]
    fn test_response_format_variants() {
        let enum_schema = encode_generation_config(&request(serde_json::json!({
            "response_format": {"type": "json_schema", "json_schema": {"schema": {"type": "STRING", "enum": ["a", "b"]}}}
        })))
        .unwrap();
        assert_eq!(enum_schema.response_mime_type.as_deref(), Some("text/x.enum"));
        assert!(enum_schema.response_schema.is_some());

        let object_schema = encode_generation_config(&request(serde_json::json!({
            "response_format": {"type": "json_schema", "json_schema": {"schema": {"type": "OBJECT"}}}
        })))
        .unwrap();
        assert_eq!(
            object_schema.response_mime_type.as_deref(),
            Some("application/json")
        );

        let json_object = encode_generation_config(&request(serde_json::json!({
            "response_format": {"type": "json_object"}
        })))
        .unwrap();
        assert_eq!(json_object.response_mime_type.as_deref(), Some("application/json"));
        assert!(json_object.response_schema.is_none());

        let text = encode_generation_config(&request(serde_json::json!({
            "response_format": {"type": "text"}
        })))
        .unwrap();
        assert_eq!(text.response_mime_type.as_deref(), Some("text/plain"));

        let err = encode_generation_config(&request(serde_json::json!({
            "response_format": {"type": "xml"}
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported response_format.type");
    }
}
