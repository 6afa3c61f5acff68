use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use openai_gemini::config::ServerConfig;
use openai_gemini::protocol::gemini::encoder::encode_gemini_request;
use openai_gemini::protocol::gemini::GeminiResponse;
use openai_gemini::protocol::mapping::{FinishReasonMap, TranslationTables};
use openai_gemini::protocol::openai_chat::response_encoder::encode_chat_completion;
use openai_gemini::protocol::openai_chat::OpenAiChatRequest;
use openai_gemini::stream::{FrameReassembler, StreamTranscoder};
use openai_gemini::transport::HttpTransport;

fn sample_request_json(messages: usize, text_len: usize) -> String {
    let text = "x".repeat(text_len);
    let mut items = vec![serde_json::json!({"role": "system", "content": "You are a helpful assistant"})];
    for i in 0..messages {
        let role = if i % 2 == 0 { "user" } else { "assistant" };
        items.push(serde_json::json!({"role": role, "content": text}));
    }
    serde_json::json!({
        "model": "gemini-1.5-pro-latest",
        "messages": items,
        "max_tokens": 256,
        "temperature": 0.7,
        "stop": ["END"],
        "response_format": {"type": "json_object"}
    })
    .to_string()
}

fn sample_stream_body(frames: usize) -> String {
    let mut body = String::new();
    for i in 0..frames {
        body.push_str("data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"token ");
        body.push_str(&i.to_string());
        body.push_str(" \\\"quoted\\\" \\u00e9\"}]},\"index\":0}]}\r\n\r\n");
    }
    body.push_str("data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"\"}]},\"finishReason\":\"STOP\",\"index\":0}],\"usageMetadata\":{\"promptTokenCount\":10,\"candidatesTokenCount\":20,\"totalTokenCount\":30}}\r\n\r\n");
    body
}

fn bench_request_encode(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let tables = TranslationTables::default();
    let transport = HttpTransport::new(&ServerConfig::default());

    for (name, messages, text_len) in [("small", 2, 64), ("large_50msg_100k", 50, 2_000)] {
        let raw = sample_request_json(messages, text_len);
        c.bench_function(&format!("encode_gemini_request_{name}"), |b| {
            b.iter(|| {
                let request: OpenAiChatRequest =
                    serde_json::from_str(black_box(&raw)).expect("request");
                let encoded = runtime
                    .block_on(encode_gemini_request(request, &tables, &transport))
                    .expect("encode");
                black_box(serde_json::to_vec(&encoded).expect("serialize"))
            });
        });
    }
}

fn bench_response_encode(c: &mut Criterion) {
    let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello there, how can I help?"},{"text":"Second part"}]},"finishReason":"STOP","index":0}],"usageMetadata":{"promptTokenCount":12,"candidatesTokenCount":8,"totalTokenCount":20}}"#;
    let finish_reasons = FinishReasonMap::default();
    c.bench_function("encode_chat_completion", |b| {
        b.iter(|| {
            let response: GeminiResponse = serde_json::from_str(black_box(raw)).expect("response");
            let completion = encode_chat_completion(
                &response,
                "gemini-1.5-pro-latest",
                "chatcmpl-bench".to_string(),
                1_700_000_000,
                &finish_reasons,
            );
            black_box(serde_json::to_vec(&completion).expect("serialize"))
        });
    });
}

fn bench_stream_transcode(c: &mut Criterion) {
    let finish_reasons = Arc::new(FinishReasonMap::default());
    for frames in [8usize, 256] {
        let body = sample_stream_body(frames);
        // Network-sized reads that split frames mid-payload.
        let chunks: Vec<&str> = body
            .as_bytes()
            .chunks(97)
            .map(|chunk| std::str::from_utf8(chunk).expect("ascii body"))
            .collect();
        c.bench_function(&format!("stream_transcode_{frames}_frames"), |b| {
            b.iter(|| {
                let mut reassembler = FrameReassembler::new();
                let mut transcoder = StreamTranscoder::new(
                    "gemini-1.5-pro-latest".to_string(),
                    "chatcmpl-bench".to_string(),
                    true,
                    Arc::clone(&finish_reasons),
                );
                let mut payloads = Vec::with_capacity(4);
                let mut out = String::new();
                for chunk in &chunks {
                    reassembler.feed_into(black_box(chunk), &mut payloads);
                    for payload in payloads.drain(..) {
                        transcoder.process_frame_into(&payload, &mut out);
                    }
                }
                transcoder.finish_into(&mut out);
                black_box(out.len())
            });
        });
    }
}

criterion_group!(
    benches,
    bench_request_encode,
    bench_response_encode,
    bench_stream_transcode
);
criterion_main!(benches);
