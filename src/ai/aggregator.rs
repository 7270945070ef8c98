//! Incremental consumer for the streamed completion body.
//!
//! Turns an arbitrarily chunked byte stream into a growing text buffer,
//! reporting every growth to the caller and the final buffer once the stream
//! ends.

use std::fmt::Display;
use std::pin::pin;

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::sse::{ParseResult, SseParser};
use crate::core::models::StreamFormat;
use crate::errors::DigestError;

/// Holds back an incomplete trailing UTF-8 sequence until the next chunk.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn decode(&mut self, bytes: &[u8]) -> Result<String, DigestError> {
        self.pending.extend_from_slice(bytes);

        match std::str::from_utf8(&self.pending) {
            Ok(valid) => {
                let text = valid.to_string();
                self.pending.clear();
                Ok(text)
            }
            Err(e) => {
                if e.error_len().is_some() {
                    return Err(DigestError::Generation(
                        "Invalid UTF-8 in streaming response".to_string(),
                    ));
                }
                let tail = self.pending.split_off(e.valid_up_to());
                let head = std::mem::replace(&mut self.pending, tail);
                String::from_utf8(head).map_err(|e| {
                    DigestError::Generation(format!("Invalid UTF-8 in streaming response: {e}"))
                })
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Outcome of pushing one decoded chunk into the buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Step {
    grew: bool,
    done: bool,
}

enum ContentDecoder {
    Plain,
    Sse {
        parser: SseParser,
        saw_text: bool,
    },
}

impl ContentDecoder {
    fn new(format: StreamFormat) -> Self {
        match format {
            StreamFormat::Plain => Self::Plain,
            StreamFormat::Sse => Self::Sse {
                parser: SseParser::new(),
                saw_text: false,
            },
        }
    }

    fn push(&mut self, text: &str, buffer: &mut String) -> Result<Step, DigestError> {
        match self {
            Self::Plain => {
                buffer.push_str(text);
                Ok(Step {
                    grew: !text.is_empty(),
                    done: false,
                })
            }
            Self::Sse { parser, saw_text } => {
                let mut step = Step::default();
                for result in parser.feed(text) {
                    step = apply_sse_result(result, buffer, saw_text, step)?;
                    if step.done {
                        break;
                    }
                }
                Ok(step)
            }
        }
    }

    /// Flushes decoder state once the transport has no more chunks.
    fn finish(&mut self, buffer: &mut String) -> Result<Step, DigestError> {
        match self {
            Self::Plain => Ok(Step {
                grew: false,
                done: true,
            }),
            Self::Sse { parser, saw_text } => {
                let mut step = Step::default();
                if let Some(result) = parser.finish() {
                    step = apply_sse_result(result, buffer, saw_text, step)?;
                }
                if step.done {
                    return Ok(step);
                }
                if *saw_text {
                    warn!("Completion stream ended without [DONE]; treating as completed");
                    return Ok(Step { done: true, ..step });
                }
                Err(DigestError::Generation(
                    "Completion stream ended before any content arrived".to_string(),
                ))
            }
        }
    }
}

fn apply_sse_result(
    result: ParseResult,
    buffer: &mut String,
    saw_text: &mut bool,
    step: Step,
) -> Result<Step, DigestError> {
    match result {
        ParseResult::Delta(delta) => {
            if delta.is_empty() {
                return Ok(step);
            }
            *saw_text = true;
            buffer.push_str(&delta);
            Ok(Step { grew: true, ..step })
        }
        ParseResult::Ignored => {
            debug!("Ignoring completion stream frame without content");
            Ok(step)
        }
        ParseResult::Done => Ok(Step { done: true, ..step }),
        ParseResult::Error(msg) => Err(DigestError::Generation(format!(
            "Completion stream error: {msg}"
        ))),
    }
}

/// Consumes a completion stream into a single text buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamAggregator {
    format: StreamFormat,
}

impl StreamAggregator {
    #[must_use]
    pub const fn new(format: StreamFormat) -> Self {
        Self { format }
    }

    /// Reads `stream` to the end.
    ///
    /// `on_partial` sees the whole buffer every time it grows; each value is a
    /// prefix of the next. `on_complete` runs once with the final buffer,
    /// equal to the last partial.
    ///
    /// # Errors
    ///
    /// Returns a [`DigestError::Generation`] on a transport error, invalid
    /// UTF-8, a stream ending inside a multi-byte character, or an error
    /// frame in SSE mode. `on_complete` is not called in that case.
    pub async fn consume<S, B, E, P, C>(
        &self,
        stream: S,
        mut on_partial: P,
        on_complete: C,
    ) -> Result<(), DigestError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
        P: FnMut(&str),
        C: FnOnce(String),
    {
        let mut stream = pin!(stream);
        let mut utf8 = Utf8Carry::default();
        let mut decoder = ContentDecoder::new(self.format);
        let mut buffer = String::new();
        let mut chunks = 0usize;

        while let Some(item) = stream.next().await {
            let bytes = item.map_err(|e| {
                DigestError::Generation(format!("Error reading streaming response: {e}"))
            })?;
            chunks += 1;

            let text = utf8.decode(bytes.as_ref())?;
            let step = decoder.push(&text, &mut buffer)?;
            if step.grew {
                on_partial(&buffer);
            }
            if step.done {
                info!(chunks, bytes = buffer.len(), "Completion stream finished");
                on_complete(buffer);
                return Ok(());
            }
        }

        if !utf8.is_empty() {
            return Err(DigestError::Generation(
                "Streaming response ended inside a multi-byte character".to_string(),
            ));
        }

        let step = decoder.finish(&mut buffer)?;
        if step.grew {
            on_partial(&buffer);
        }

        info!(chunks, bytes = buffer.len(), "Completion stream finished");
        on_complete(buffer);
        Ok(())
    }

    /// Drains `stream` and returns the final text without partial callbacks.
    ///
    /// # Errors
    ///
    /// Same as [`StreamAggregator::consume`].
    pub async fn collect_text<S, B, E>(&self, stream: S) -> Result<String, DigestError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let mut collected = String::new();
        self.consume(stream, |_| {}, |text| collected = text).await?;
        Ok(collected)
    }
}
