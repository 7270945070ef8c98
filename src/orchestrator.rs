//! Runs one analysis session: extraction, streamed completion, optional
//! translation.
//!
//! Session state lives in a [`tokio::sync::watch`] channel. Observers
//! subscribe to snapshots; all mutations go through the id-checked
//! transitions of [`SessionState`].

use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::ai::StreamAggregator;
use crate::clients::{Completer, Extractor, Translator};
use crate::core::models::{AnalysisRequest, Language};
use crate::errors::DigestError;
use crate::prompt::{build_messages, select_prompt};
use crate::session::{SessionId, SessionState};

/// Message stored for a blank URL.
pub const EMPTY_URL_MESSAGE: &str = "Please enter a valid URL";

pub struct Orchestrator<E, C, T> {
    extractor: E,
    completer: C,
    translator: T,
    source_language: Language,
    state: watch::Sender<SessionState>,
}

impl<E, C, T> Orchestrator<E, C, T>
where
    E: Extractor,
    C: Completer,
    T: Translator,
{
    pub fn new(extractor: E, completer: C, translator: T) -> Self {
        Self {
            extractor,
            completer,
            translator,
            source_language: Language::Arabic,
            state: watch::Sender::new(SessionState::default()),
        }
    }

    /// Language the completion output is written in.
    #[must_use]
    pub fn with_source_language(mut self, language: Language) -> Self {
        self.source_language = language;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Runs a full session for `request` and returns its id.
    ///
    /// The returned error is also stored in the session state. A failed
    /// translation is not an error here: the session ends `Done` with the
    /// untranslated text and the translation error stored.
    ///
    /// # Errors
    ///
    /// - [`DigestError::Busy`] while another session is still loading
    /// - [`DigestError::Validation`] for a blank or unusable URL
    /// - [`DigestError::Extraction`] / [`DigestError::Generation`] from the
    ///   collaborators
    pub async fn submit(&self, request: AnalysisRequest) -> Result<SessionId, DigestError> {
        let mut outcome = Err(DigestError::Busy);
        self.state.send_if_modified(|s| {
            if s.loading {
                return false;
            }
            outcome = match validate_url(&request.url) {
                Ok(url) => Ok((s.begin(), url)),
                Err(e) => {
                    s.reject(e.to_string());
                    Err(e)
                }
            };
            true
        });

        let (id, url) = match outcome {
            Ok(started) => started,
            Err(DigestError::Busy) => {
                debug!("Ignoring submission while a session is loading");
                return Err(DigestError::Busy);
            }
            Err(e) => {
                warn!(error = %e, "Rejected submission");
                return Err(e);
            }
        };

        let correlation_id = uuid::Uuid::new_v4().to_string();
        info!(
            session_id = %id,
            %correlation_id,
            url = %url,
            mode = %request.mode,
            target = %request.target_language,
            "Starting analysis session"
        );

        match self.run_session(id, &request, url.as_str()).await {
            Ok(()) => Ok(id),
            Err(e) => {
                error!(session_id = %id, %correlation_id, error = %e, "Analysis session failed");
                self.apply(|s| s.apply_error(id, e.to_string()));
                Err(e)
            }
        }
    }

    async fn run_session(
        &self,
        id: SessionId,
        request: &AnalysisRequest,
        url: &str,
    ) -> Result<(), DigestError> {
        let raw_text = self.extractor.extract(url).await?;
        let instruction = select_prompt(request.mode, request.summary_length);
        let prompt = build_messages(&instruction, &raw_text);
        if !self.apply(|s| s.apply_extracted(id, raw_text)) {
            debug!(session_id = %id, "Dropping extraction result of a superseded session");
            return Ok(());
        }

        let stream = self.completer.complete(prompt).await?;
        self.apply(|s| s.apply_stream_opened(id));

        let aggregator = StreamAggregator::new(self.completer.stream_format());
        let mut finished = None;
        aggregator
            .consume(
                stream,
                |partial| {
                    self.apply(|s| s.apply_partial(id, partial));
                },
                |text| finished = Some(text),
            )
            .await?;
        let finished = finished.unwrap_or_default();

        if request.target_language == self.source_language {
            if self.apply(|s| s.apply_done(id, finished, None)) {
                info!(session_id = %id, "Analysis session done");
            } else {
                debug!(session_id = %id, "Dropping result of a superseded session");
            }
            return Ok(());
        }

        if !self.apply(|s| s.apply_translating(id, &finished)) {
            debug!(session_id = %id, "Skipping translation for a superseded session");
            return Ok(());
        }

        let applied = match self
            .translator
            .translate(&finished, request.target_language, self.source_language)
            .await
        {
            Ok(translated) => self.apply(|s| s.apply_done(id, translated, None)),
            Err(e) => {
                warn!(session_id = %id, error = %e, "Translation failed; showing original text");
                self.apply(|s| s.apply_done(id, finished, Some(e.to_string())))
            }
        };
        if applied {
            info!(session_id = %id, "Analysis session done");
        } else {
            debug!(session_id = %id, "Dropping translation of a superseded session");
        }
        Ok(())
    }

    /// Applies a transition; returns whether it took effect.
    fn apply<F>(&self, transition: F) -> bool
    where
        F: FnOnce(&mut SessionState) -> bool,
    {
        self.state.send_if_modified(transition)
    }
}

/// Checks that the submitted URL is usable before any network call.
///
/// # Errors
///
/// Returns [`DigestError::Validation`] for a blank URL or one that is not
/// an absolute http(s) URL.
pub fn validate_url(raw: &str) -> Result<Url, DigestError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DigestError::Validation(EMPTY_URL_MESSAGE.to_string()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| DigestError::Validation(format!("{EMPTY_URL_MESSAGE}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DigestError::Validation(format!(
            "{EMPTY_URL_MESSAGE}: unsupported scheme {}",
            url.scheme()
        )));
    }
    Ok(url)
}
