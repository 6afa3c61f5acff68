use crate::util::{push_json_string_escaped, push_u64_decimal};

use super::OpenAiUsage;

/// Per-stream constants written into every `chat.completion.chunk`.
#[derive(Debug, Clone, Copy)]
pub struct ChunkHeader<'a> {
    pub id: &'a str,
    pub model: &'a str,
    pub created: u64,
    /// Client opted into `stream_options.include_usage`; every chunk then
    /// carries a `usage` key, `null` except on terminal chunks.
    pub include_usage: bool,
}

/// Role-announcing chunk: `delta:{"role":"assistant","content":""}`.
pub fn encode_first_chunk(out: &mut String, header: &ChunkHeader<'_>, index: u32) {
    push_openai_chunk_prefix(out, header, index);
    out.push_str("\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"logprobs\":null,\"finish_reason\":null}]");
    push_chunk_suffix(out, header, None);
}

/// Content delta chunk with `finish_reason: null`.
pub fn encode_content_chunk(out: &mut String, header: &ChunkHeader<'_>, index: u32, text: &str) {
    push_openai_chunk_prefix(out, header, index);
    out.push_str("\"delta\":{\"content\":");
    push_json_string_escaped(out, text);
    out.push_str("},\"logprobs\":null,\"finish_reason\":null}]");
    push_chunk_suffix(out, header, None);
}

/// Terminal chunk: empty delta, non-null finish reason, optional usage.
pub fn encode_terminal_chunk(
    out: &mut String,
    header: &ChunkHeader<'_>,
    index: u32,
    finish_reason: &str,
    usage: Option<&OpenAiUsage>,
) {
    push_openai_chunk_prefix(out, header, index);
    out.push_str("\"delta\":{},\"logprobs\":null,\"finish_reason\":");
    push_json_string_escaped(out, finish_reason);
    out.push_str("}]");
    push_chunk_suffix(out, header, usage);
}

fn push_openai_chunk_prefix(out: &mut String, header: &ChunkHeader<'_>, index: u32) {
    out.push_str("data: {\"id\":");
    push_json_string_escaped(out, header.id);
    out.push_str(",\"object\":\"chat.completion.chunk\",\"created\":");
    push_u64_decimal(out, header.created);
    out.push_str(",\"model\":");
    push_json_string_escaped(out, header.model);
    out.push_str(",\"choices\":[{\"index\":");
    push_u64_decimal(out, u64::from(index));
    out.push(',');
}

fn push_chunk_suffix(out: &mut String, header: &ChunkHeader<'_>, usage: Option<&OpenAiUsage>) {
    if header.include_usage {
        out.push_str(",\"usage\":");
        match usage {
            Some(usage) => push_usage(out, usage),
            None => out.push_str("null"),
        }
    }
    out.push_str("}\n\n");
}

fn push_usage(out: &mut String, usage: &OpenAiUsage) {
    out.push('{');
    let mut first = true;
    for (key, value) in [
        ("completion_tokens", usage.completion_tokens),
        ("prompt_tokens", usage.prompt_tokens),
        ("total_tokens", usage.total_tokens),
    ] {
        let Some(value) = value else { continue };
        if !first {
            out.push(',');
        }
        first = false;
        out.push('"');
        out.push_str(key);
        out.push_str("\":");
        push_u64_decimal(out, value);
    }
    out.push('}');
}
