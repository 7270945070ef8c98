//! Server-Sent Events (SSE) parser for chat-completion streaming responses.
//!
//! Handles frames split across TCP chunks and several frames arriving in one
//! read. Emits the content deltas of `choices[0].delta.content`, the `[DONE]`
//! sentinel and error payloads; every other frame is reported as ignored.

use serde_json::Value;

/// Result of parsing one SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// A content delta from a `chat.completion.chunk`.
    Delta(String),
    /// The frame parsed but carried no content (role preamble, finish reason, ...).
    Ignored,
    /// The server reported an error inside the stream.
    Error(String),
    /// End of stream signal (`[DONE]`).
    Done,
}

/// Stateful SSE parser that buffers incomplete frames across chunk boundaries.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feeds a chunk of text and returns the results of all complete frames.
    pub fn feed(&mut self, chunk: &str) -> Vec<ParseResult> {
        self.buffer.push_str(chunk);
        let mut results = Vec::new();

        while let Some(event_end) = self.find_event_boundary() {
            let event_text = self.buffer[..event_end].to_string();
            self.buffer = self.buffer[event_end..]
                .trim_start_matches(['\r', '\n'])
                .to_string();

            if let Some(result) = Self::parse_event(&event_text) {
                results.push(result);
            }
        }

        results
    }

    /// Parses whatever is left in the buffer once the transport has ended.
    ///
    /// Servers are allowed to close the connection right after the last
    /// `data:` line without the trailing blank line.
    pub fn finish(&mut self) -> Option<ParseResult> {
        let rest = std::mem::take(&mut self.buffer);
        Self::parse_event(&rest)
    }

    fn find_event_boundary(&self) -> Option<usize> {
        let lf = self.buffer.find("\n\n").map(|pos| pos + 2);
        let crlf = self.buffer.find("\r\n\r\n").map(|pos| pos + 4);
        match (lf, crlf) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn parse_event(event_text: &str) -> Option<ParseResult> {
        let data_lines: Vec<&str> = event_text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(':'))
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .filter(|data| !data.is_empty())
            .collect();

        if data_lines.is_empty() {
            return None;
        }

        let data = data_lines.join("\n");
        if data == "[DONE]" {
            return Some(ParseResult::Done);
        }

        Some(Self::parse_json_event(&data))
    }

    fn parse_json_event(data: &str) -> ParseResult {
        let json: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => return ParseResult::Error(format!("Malformed stream payload: {e}")),
        };

        if let Some(error) = json.get("error") {
            return ParseResult::Error(extract_error_message(error));
        }

        json.get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("delta"))
            .and_then(|delta| delta.get("content"))
            .and_then(Value::as_str)
            .map_or(ParseResult::Ignored, |content| {
                ParseResult::Delta(content.to_string())
            })
    }
}

fn extract_error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .unwrap_or("Unknown error")
        .to_string()
}
