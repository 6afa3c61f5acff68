use std::collections::BTreeMap;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::protocol::gemini::{GeminiCandidate, GeminiContent, GeminiPart, GeminiResponse};
use crate::protocol::mapping::{gemini_usage_to_openai, FinishReasonMap, FORCED_FINISH_REASON};
use crate::protocol::openai_chat::stream::{
    encode_content_chunk, encode_first_chunk, encode_terminal_chunk, ChunkHeader,
};
use crate::protocol::openai_chat::OpenAiUsage;
use crate::stream::sse::DONE_FRAME;
use crate::util::unix_now_secs;

/// Finish reason carried by synthesized events for undecodable frames.
pub const DECODE_ERROR_FINISH_REASON: &str = "error";

/// Lifecycle of one candidate index. Unseen indices have no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePhase {
    Started,
    Terminated,
}

#[derive(Debug)]
struct CandidateState {
    phase: CandidatePhase,
    last_usage: Option<OpenAiUsage>,
}

/// Converts Gemini stream events into `OpenAI` `chat.completion.chunk` frames.
///
/// One instance per response stream. Per candidate index the output is
/// always: one role chunk, zero or more content chunks, one terminal chunk.
/// [`StreamTranscoder::finish_into`] closes every candidate left open and
/// appends `[DONE]`.
#[derive(Debug)]
pub struct StreamTranscoder {
    id: String,
    model: String,
    created: u64,
    include_usage: bool,
    finish_reasons: Arc<FinishReasonMap>,
    candidates: BTreeMap<u32, CandidateState>,
    finished: bool,
}

impl StreamTranscoder {
    #[must_use]
    pub fn new(
        model: String,
        id: String,
        include_usage: bool,
        finish_reasons: Arc<FinishReasonMap>,
    ) -> Self {
        Self {
            id,
            model,
            created: unix_now_secs(),
            include_usage,
            finish_reasons,
            candidates: BTreeMap::new(),
            finished: false,
        }
    }

    #[must_use]
    pub fn created(&self) -> u64 {
        self.created
    }

    #[must_use]
    pub fn candidate_phase(&self, index: u32) -> Option<CandidatePhase> {
        self.candidates.get(&index).map(|c| c.phase)
    }

    /// Parse one frame payload. A payload that is not a valid Gemini event
    /// becomes an `error`-finished event for every candidate seen so far (or
    /// candidate 0), carrying the parse error as text.
    #[must_use]
    pub fn decode_event(&self, payload: &str) -> GeminiResponse {
        match serde_json::from_str::<GeminiResponse>(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, payload_len = payload.len(), "undecodable upstream stream frame");
                let mut indices: SmallVec<[u32; 4]> = self.candidates.keys().copied().collect();
                if indices.is_empty() {
                    indices.push(0);
                }
                let message = err.to_string();
                GeminiResponse {
                    candidates: Some(
                        indices
                            .into_iter()
                            .map(|index| GeminiCandidate {
                                content: Some(GeminiContent {
                                    role: None,
                                    parts: vec![GeminiPart::text(message.clone())],
                                }),
                                finish_reason: Some(DECODE_ERROR_FINISH_REASON.to_string()),
                                index: Some(index),
                            })
                            .collect(),
                    ),
                    usage_metadata: None,
                    model_version: None,
                }
            }
        }
    }

    /// Decode one frame payload and append the resulting client frames.
    pub fn process_frame_into(&mut self, payload: &str, out: &mut String) {
        let event = self.decode_event(payload);
        self.process_event_into(&event, out);
    }

    /// Append the client frames for one decoded Gemini event. Events without
    /// candidates produce nothing.
    pub fn process_event_into(&mut self, event: &GeminiResponse, out: &mut String) {
        let Some(candidates) = event.candidates.as_deref() else {
            return;
        };
        let event_usage = event.usage_metadata.as_ref().map(gemini_usage_to_openai);
        let header = ChunkHeader {
            id: &self.id,
            model: &self.model,
            created: self.created,
            include_usage: self.include_usage,
        };

        for candidate in candidates {
            let index = candidate.index();
            let state = self.candidates.entry(index).or_insert_with(|| {
                encode_first_chunk(out, &header, index);
                CandidateState {
                    phase: CandidatePhase::Started,
                    last_usage: None,
                }
            });

            if state.phase == CandidatePhase::Terminated {
                tracing::debug!(index, "dropping event for already terminated candidate");
                continue;
            }
            // A forced close reports the usage of the candidate's last event only.
            state.last_usage.clone_from(&event_usage);

            let text = candidate.joined_text();
            if !text.is_empty() {
                encode_content_chunk(out, &header, index, &text);
            }

            if let Some(reason) = candidate.finish_reason.as_deref() {
                let usage = if self.include_usage {
                    event_usage.as_ref()
                } else {
                    None
                };
                encode_terminal_chunk(out, &header, index, self.finish_reasons.map(reason), usage);
                state.phase = CandidatePhase::Terminated;
            }
        }
    }

    /// Close every candidate still open with a `stop` terminal chunk, then
    /// append `[DONE]`. Later calls are no-ops.
    pub fn finish_into(&mut self, out: &mut String) {
        if self.finished {
            return;
        }
        self.finished = true;

        let header = ChunkHeader {
            id: &self.id,
            model: &self.model,
            created: self.created,
            include_usage: self.include_usage,
        };
        for (&index, state) in &mut self.candidates {
            if state.phase != CandidatePhase::Started {
                continue;
            }
            tracing::debug!(index, "closing candidate without upstream finish reason");
            let usage = if self.include_usage {
                state.last_usage.as_ref()
            } else {
                None
            };
            encode_terminal_chunk(out, &header, index, FORCED_FINISH_REASON, usage);
            state.phase = CandidatePhase::Terminated;
        }
        out.push_str(DONE_FRAME);
    }
}
