//! Stream framing and the shared decode loop
//!
//! Framing turns raw network reads into complete text frames (SSE `data:`
//! payloads or NDJSON lines). A [`StreamDecoder`] turns each frame into
//! [`StreamEvent`]s, and the [`ResponseBuilder`] folds those into the
//! final response while forwarding increments to the caller.

pub mod accumulate;
pub(crate) mod aggregate;
pub mod lines;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use serde::de::DeserializeOwned;

use self::aggregate::ResponseBuilder;
use self::lines::LineSplitter;
use crate::error::{LlmError, TransportError};
use crate::transport::ByteStream;
use crate::types::{LlmResponse, SideEvent, StreamEvent};

/// Complete text frames extracted from a response body
pub(crate) type FrameStream = BoxStream<'static, Result<String, TransportError>>;

/// Per-request state machine for one backend's stream format
pub(crate) trait StreamDecoder: Send {
    /// Handle one complete frame
    fn decode(&mut self, frame: &str) -> Vec<StreamEvent>;

    /// Flush state once the body ends or the backend signals completion
    fn finish(&mut self) -> Vec<StreamEvent> {
        Vec::new()
    }

    /// Backend signalled the end of the stream
    fn is_done(&self) -> bool;
}

/// Parse a frame, logging and skipping anything that does not match `T`
pub(crate) fn parse_frame<T: DeserializeOwned>(frame: &str) -> Option<T> {
    match serde_json::from_str(frame) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::debug!(error = %e, data = %frame, "skipping unparseable stream chunk");
            None
        }
    }
}

/// SSE `data:` payloads, one per line
///
/// Every complete `data:` line is a frame of its own, with or without a blank
/// line after it. `event:`, `id:` and `retry:` fields and `:` comments carry
/// nothing the decoders need.
pub(crate) fn sse_frames(body: ByteStream) -> FrameStream {
    line_frames(body, Framing::Sse)
}

/// One frame per non-empty line; a trailing unterminated line is flushed at EOF
pub(crate) fn ndjson_frames(body: ByteStream) -> FrameStream {
    line_frames(body, Framing::Ndjson)
}

#[derive(Debug, Clone, Copy)]
enum Framing {
    Sse,
    Ndjson,
}

impl Framing {
    /// Frame carried by one trimmed, non-empty line
    fn extract(self, line: &str) -> Option<&str> {
        match self {
            Self::Ndjson => Some(line),
            Self::Sse => {
                let data = line.strip_prefix("data:")?.trim();
                (!data.is_empty()).then_some(data)
            }
        }
    }
}

struct LineState {
    body: ByteStream,
    lines: LineSplitter,
    framing: Framing,
    exhausted: bool,
}

impl LineState {
    fn next_frame(&mut self) -> Option<String> {
        while let Some(line) = self.lines.next_line() {
            if let Some(frame) = self.framing.extract(&line) {
                return Some(frame.to_owned());
            }
        }
        None
    }
}

fn line_frames(body: ByteStream, framing: Framing) -> FrameStream {
    let state = LineState {
        body,
        lines: LineSplitter::new(),
        framing,
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.next_frame() {
                return Some((Ok(frame), state));
            }
            if state.exhausted {
                let remainder = state.lines.take_remainder()?;
                let frame = state.framing.extract(&remainder).map(str::to_owned)?;
                return Some((Ok(frame), state));
            }
            match state.body.next().await {
                Some(Ok(read)) => state.lines.extend(&read),
                Some(Err(e)) => {
                    state.exhausted = true;
                    state.lines = LineSplitter::new();
                    return Some((Err(e), state));
                }
                None => state.exhausted = true,
            }
        }
    })
    .boxed()
}

/// Run `decoder` over `frames` until the body ends or the decoder is done
pub(crate) async fn drive<D, F>(
    mut frames: FrameStream,
    mut decoder: D,
    on_chunk: F,
    model: Option<String>,
) -> Result<LlmResponse, LlmError>
where
    D: StreamDecoder,
    F: FnMut(&str, Option<&SideEvent>) + Send,
{
    let mut builder = ResponseBuilder::new(on_chunk, model);

    while let Some(frame) = frames.next().await {
        builder.apply_all(decoder.decode(&frame?));
        if decoder.is_done() {
            break;
        }
    }

    builder.apply_all(decoder.finish());

    Ok(builder.finish())
}
