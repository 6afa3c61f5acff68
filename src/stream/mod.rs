pub mod sse;
pub mod transcoder;

use std::convert::Infallible;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

pub use sse::{FrameReassembler, Utf8ChunkDecoder, DONE_FRAME};
pub use transcoder::{CandidatePhase, StreamTranscoder};

struct PipelineState<S> {
    upstream: std::pin::Pin<Box<S>>,
    utf8: Utf8ChunkDecoder,
    reassembler: FrameReassembler,
    transcoder: StreamTranscoder,
    text: String,
    frames: Vec<String>,
    done: bool,
}

impl<S> PipelineState<S> {
    fn transcode_text(&mut self, out: &mut String) {
        self.reassembler.feed_into(&self.text, &mut self.frames);
        self.text.clear();
        for frame in self.frames.drain(..) {
            self.transcoder.process_frame_into(&frame, out);
        }
    }

    fn finish(&mut self) -> String {
        let mut out = String::new();
        if let Some(replacement) = self.utf8.finish() {
            self.text.push(replacement);
            self.transcode_text(&mut out);
        }
        if let Some(residue) = self.reassembler.finish() {
            tracing::error!(
                residue_len = residue.len(),
                residue = %residue,
                "upstream stream ended inside a frame"
            );
            self.transcoder.process_frame_into(&residue, &mut out);
        }
        self.transcoder.finish_into(&mut out);
        out
    }
}

/// Translate a Gemini `alt=sse` response body into an `OpenAI` chat
/// completion SSE body.
///
/// Each upstream chunk yields at most one output chunk holding every frame it
/// completed. An upstream read error ends the stream like a normal close:
/// open candidates are terminated and `[DONE]` is still sent. Dropping the
/// returned stream drops the upstream body.
pub fn transcode_gemini_stream<S, E>(
    byte_stream: S,
    transcoder: StreamTranscoder,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = PipelineState {
        upstream: Box::pin(byte_stream),
        utf8: Utf8ChunkDecoder::new(),
        reassembler: FrameReassembler::new(),
        transcoder,
        text: String::new(),
        frames: Vec::with_capacity(4),
        done: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            match state.upstream.next().await {
                Some(Ok(bytes)) => {
                    state.utf8.decode_into(&bytes, &mut state.text);
                    let mut out = String::new();
                    state.transcode_text(&mut out);
                    if !out.is_empty() {
                        return Some((Ok(Bytes::from(out)), state));
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "upstream stream read failed; closing open candidates");
                    break;
                }
                None => break,
            }
        }
        state.done = true;
        let out = state.finish();
        Some((Ok(Bytes::from(out)), state))
    })
}
