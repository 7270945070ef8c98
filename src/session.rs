//! Session state and its transitions.
//!
//! Every write coming back from async work carries the [`SessionId`] it was
//! started for. A transition only applies when that id is still the current
//! one, so results of a superseded session never overwrite the state of a
//! newer one. Each transition returns `true` when it changed the state.

use std::fmt;

/// Identifies one analysis session. Ids increase monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(u64);

impl SessionId {
    #[must_use]
    const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Extracting,
    Generating,
    Translating,
    Done,
    Error,
}

impl Phase {
    /// No further transition will happen for this session.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub id: SessionId,
    pub phase: Phase,
    /// Set while the trigger must stay disabled.
    pub loading: bool,
    pub error: Option<String>,
    pub raw_text: String,
    pub streaming_text: String,
    pub processed_text: String,
}

impl SessionState {
    #[must_use]
    pub fn is_current(&self, id: SessionId) -> bool {
        self.id == id
    }

    /// Text to display: the live buffer while streaming, the result after.
    #[must_use]
    pub fn display_text(&self) -> &str {
        if self.streaming_text.is_empty() {
            &self.processed_text
        } else {
            &self.streaming_text
        }
    }

    /// Rejects a submission with a validation message. No session starts.
    pub fn reject(&mut self, message: impl Into<String>) -> bool {
        self.error = Some(message.into());
        true
    }

    /// Starts a new session: clears all text and the error and returns the
    /// new id.
    pub fn begin(&mut self) -> SessionId {
        let id = self.id.next();
        *self = Self {
            id,
            phase: Phase::Extracting,
            loading: true,
            ..Self::default()
        };
        id
    }

    pub fn apply_extracted(&mut self, id: SessionId, raw_text: String) -> bool {
        if !self.is_current(id) || self.phase != Phase::Extracting {
            return false;
        }
        self.raw_text = raw_text;
        self.phase = Phase::Generating;
        true
    }

    /// The completion stream is open; the trigger can be used again.
    pub fn apply_stream_opened(&mut self, id: SessionId) -> bool {
        if !self.is_current(id) || self.phase != Phase::Generating {
            return false;
        }
        self.loading = false;
        true
    }

    pub fn apply_partial(&mut self, id: SessionId, partial: &str) -> bool {
        if !self.is_current(id) || self.phase != Phase::Generating {
            return false;
        }
        partial.clone_into(&mut self.streaming_text);
        true
    }

    /// Generation finished and translation is needed.
    pub fn apply_translating(&mut self, id: SessionId, finished: &str) -> bool {
        if !self.is_current(id) || self.phase != Phase::Generating {
            return false;
        }
        finished.clone_into(&mut self.streaming_text);
        self.phase = Phase::Translating;
        true
    }

    /// Final text is known. `warning` keeps a non-fatal error visible; a
    /// rejection stored while the session was streaming is kept otherwise.
    pub fn apply_done(&mut self, id: SessionId, text: String, warning: Option<String>) -> bool {
        if !self.is_current(id) || !matches!(self.phase, Phase::Generating | Phase::Translating) {
            return false;
        }
        self.processed_text = text;
        self.streaming_text.clear();
        if warning.is_some() {
            self.error = warning;
        }
        self.phase = Phase::Done;
        self.loading = false;
        true
    }

    pub fn apply_error(&mut self, id: SessionId, message: String) -> bool {
        if !self.is_current(id) || !matches!(self.phase, Phase::Extracting | Phase::Generating) {
            return false;
        }
        self.error = Some(message);
        self.phase = Phase::Error;
        self.loading = false;
        true
    }
}
