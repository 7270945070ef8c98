use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content};
use tokio::sync::Notify;

use pagedigest::ai::ByteStream;
use pagedigest::clients::{Completer, Extractor, Translator};
use pagedigest::core::models::{AnalysisRequest, Language};
use pagedigest::errors::DigestError;
use pagedigest::orchestrator::{EMPTY_URL_MESSAGE, Orchestrator};
use pagedigest::prompt::AnalysisMode;
use pagedigest::session::Phase;

const PAGE_URL: &str = "https://example.com/article";

fn stream_of(parts: &[&str]) -> ByteStream {
    let items: Vec<Result<Bytes, DigestError>> = parts
        .iter()
        .map(|p| Ok(Bytes::from(p.to_string())))
        .collect();
    Box::pin(futures::stream::iter(items))
}

struct FakeExtractor {
    result: Result<String, String>,
    gate: Option<Arc<Notify>>,
    calls: Arc<AtomicUsize>,
}

impl FakeExtractor {
    fn ok(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            gate: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            ..Self::ok("")
        }
    }

    fn gated(text: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::ok(text)
        }
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, _url: &str) -> Result<String, DigestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.clone().map_err(DigestError::Extraction)
    }
}

/// Hands out the queued streams in order, one per call.
struct ScriptedCompleter {
    streams: Mutex<VecDeque<ByteStream>>,
    prompts: Arc<Mutex<Vec<Vec<ChatCompletionMessage>>>>,
}

impl ScriptedCompleter {
    fn new(streams: Vec<ByteStream>) -> Self {
        Self {
            streams: Mutex::new(streams.into()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(
        &self,
        prompt: Vec<ChatCompletionMessage>,
    ) -> Result<ByteStream, DigestError> {
        self.prompts.lock().unwrap().push(prompt);
        self.streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DigestError::Generation("no scripted stream left".to_string()))
    }
}

struct FakeTranslator {
    result: Result<String, String>,
    calls: Arc<Mutex<Vec<(String, Language, Language)>>>,
}

impl FakeTranslator {
    fn ok(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(
        &self,
        text: &str,
        target: Language,
        source: Language,
    ) -> Result<String, DigestError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), target, source));
        self.result.clone().map_err(DigestError::Translation)
    }
}

#[tokio::test]
async fn test_same_language_skips_translation() {
    let extractor = FakeExtractor::ok("raw page text");
    let completer = ScriptedCompleter::new(vec![stream_of(&["### عنوان\n", "* نقطة"])]);
    let translator = FakeTranslator::ok("unused");
    let prompts = completer.prompts.clone();
    let translations = translator.calls.clone();
    let orchestrator = Orchestrator::new(extractor, completer, translator);

    let request = AnalysisRequest::new(PAGE_URL).with_mode(AnalysisMode::Bullets);
    let id = orchestrator.submit(request).await.unwrap();

    let state = orchestrator.snapshot();
    assert_eq!(state.id, id);
    assert_eq!(state.phase, Phase::Done);
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(state.raw_text, "raw page text");
    assert_eq!(state.processed_text, "### عنوان\n* نقطة");
    assert!(state.streaming_text.is_empty());
    assert!(translations.lock().unwrap().is_empty());

    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].len(), 2);
    assert!(matches!(&prompts[0][1].content, Content::Text(t) if t == "raw page text"));
}

#[tokio::test]
async fn test_other_language_translates_once() {
    let completer = ScriptedCompleter::new(vec![stream_of(&["نص ", "عربي"])]);
    let translator = FakeTranslator::ok("English text");
    let translations = translator.calls.clone();
    let orchestrator = Orchestrator::new(FakeExtractor::ok("raw"), completer, translator);

    let request = AnalysisRequest::new(PAGE_URL).with_target_language(Language::English);
    orchestrator.submit(request).await.unwrap();

    let state = orchestrator.snapshot();
    assert_eq!(state.phase, Phase::Done);
    assert_eq!(state.processed_text, "English text");
    assert!(state.error.is_none());

    let calls = translations.lock().unwrap();
    assert_eq!(
        *calls,
        vec![("نص عربي".to_string(), Language::English, Language::Arabic)]
    );
}

#[tokio::test]
async fn test_translation_failure_keeps_original_text() {
    let completer = ScriptedCompleter::new(vec![stream_of(&["original"])]);
    let orchestrator = Orchestrator::new(
        FakeExtractor::ok("raw"),
        completer,
        FakeTranslator::failing("quota exceeded"),
    );

    let request = AnalysisRequest::new(PAGE_URL).with_target_language(Language::French);
    assert!(orchestrator.submit(request).await.is_ok());

    let state = orchestrator.snapshot();
    assert_eq!(state.phase, Phase::Done);
    assert!(!state.loading);
    assert_eq!(state.processed_text, "original");
    assert_eq!(
        state.error.as_deref(),
        Some("Failed to translate content: quota exceeded")
    );
}

#[tokio::test]
async fn test_extraction_failure_never_calls_completion() {
    let completer = ScriptedCompleter::new(vec![stream_of(&["unused"])]);
    let prompts = completer.prompts.clone();
    let orchestrator = Orchestrator::new(
        FakeExtractor::failing("status 500"),
        completer,
        FakeTranslator::ok("unused"),
    );

    let err = orchestrator
        .submit(AnalysisRequest::new(PAGE_URL))
        .await
        .unwrap_err();

    assert!(matches!(err, DigestError::Extraction(_)));
    let state = orchestrator.snapshot();
    assert_eq!(state.phase, Phase::Error);
    assert!(!state.loading);
    assert_eq!(
        state.error.as_deref(),
        Some("Failed to extract content: status 500")
    );
    assert!(prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_completion_request_failure_ends_in_error() {
    let translator = FakeTranslator::ok("unused");
    let translations = translator.calls.clone();
    let orchestrator = Orchestrator::new(
        FakeExtractor::ok("raw"),
        ScriptedCompleter::new(Vec::new()),
        translator,
    );

    let request = AnalysisRequest::new(PAGE_URL).with_target_language(Language::English);
    let err = orchestrator.submit(request).await.unwrap_err();

    assert!(matches!(err, DigestError::Generation(_)));
    let state = orchestrator.snapshot();
    assert_eq!(state.phase, Phase::Error);
    assert!(!state.loading);
    assert_eq!(state.raw_text, "raw");
    assert!(state.processed_text.is_empty());
    assert!(translations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stream_failure_ends_in_error() {
    let items: Vec<Result<Bytes, DigestError>> = vec![
        Ok(Bytes::from("partial ")),
        Err(DigestError::HttpError("connection reset".to_string())),
    ];
    let completer = ScriptedCompleter::new(vec![Box::pin(futures::stream::iter(items))]);
    let orchestrator =
        Orchestrator::new(FakeExtractor::ok("raw"), completer, FakeTranslator::ok(""));

    let err = orchestrator
        .submit(AnalysisRequest::new(PAGE_URL))
        .await
        .unwrap_err();

    assert!(matches!(err, DigestError::Generation(_)));
    let state = orchestrator.snapshot();
    assert_eq!(state.phase, Phase::Error);
    assert!(
        state
            .error
            .as_deref()
            .is_some_and(|e| e.contains("Error reading streaming response"))
    );
}

#[tokio::test]
async fn test_blank_url_is_rejected_without_network() {
    let extractor = FakeExtractor::ok("raw");
    let extractions = extractor.calls.clone();
    let orchestrator = Orchestrator::new(
        extractor,
        ScriptedCompleter::new(Vec::new()),
        FakeTranslator::ok(""),
    );

    let err = orchestrator
        .submit(AnalysisRequest::new("   "))
        .await
        .unwrap_err();

    assert!(matches!(err, DigestError::Validation(_)));
    let state = orchestrator.snapshot();
    assert_eq!(state.phase, Phase::Idle);
    assert!(!state.loading);
    assert_eq!(
        state.error.as_deref(),
        Some(format!("Invalid input: {EMPTY_URL_MESSAGE}").as_str())
    );
    assert_eq!(extractions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_submit_while_loading_is_busy() {
    let gate = Arc::new(Notify::new());
    let extractor = FakeExtractor::gated("raw", gate.clone());
    let extractions = extractor.calls.clone();
    let orchestrator = Arc::new(Orchestrator::new(
        extractor,
        ScriptedCompleter::new(vec![stream_of(&["done"])]),
        FakeTranslator::ok(""),
    ));
    let mut rx = orchestrator.subscribe();

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(AnalysisRequest::new(PAGE_URL)).await }
    });
    rx.wait_for(|s| s.loading).await.unwrap();
    let running = orchestrator.snapshot().id;

    let err = orchestrator
        .submit(AnalysisRequest::new("https://example.com/other"))
        .await
        .unwrap_err();
    assert!(matches!(err, DigestError::Busy));
    assert_eq!(orchestrator.snapshot().id, running);

    gate.notify_one();
    let id = first.await.unwrap().unwrap();

    assert_eq!(id, running);
    assert_eq!(orchestrator.snapshot().phase, Phase::Done);
    assert_eq!(extractions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_superseded_session_cannot_write() {
    let (tx, rx_stream) = mpsc::unbounded::<Result<Bytes, DigestError>>();
    let completer = ScriptedCompleter::new(vec![Box::pin(rx_stream), stream_of(&["second"])]);
    let orchestrator = Arc::new(Orchestrator::new(
        FakeExtractor::ok("raw"),
        completer,
        FakeTranslator::ok(""),
    ));
    let mut rx = orchestrator.subscribe();

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(AnalysisRequest::new(PAGE_URL)).await }
    });

    tx.unbounded_send(Ok(Bytes::from("old "))).unwrap();
    rx.wait_for(|s| s.streaming_text == "old ").await.unwrap();
    assert!(!orchestrator.snapshot().loading);

    let second = orchestrator
        .submit(AnalysisRequest::new("https://example.com/second"))
        .await
        .unwrap();

    tx.unbounded_send(Ok(Bytes::from("stale"))).unwrap();
    drop(tx);
    let first_id = first.await.unwrap().unwrap();

    assert!(second > first_id);
    let state = orchestrator.snapshot();
    assert_eq!(state.id, second);
    assert_eq!(state.phase, Phase::Done);
    assert_eq!(state.processed_text, "second");
    assert!(state.streaming_text.is_empty());
    assert!(state.error.is_none());
}

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_superseded_session_is_not_logged_as_done() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (tx, rx_stream) = mpsc::unbounded::<Result<Bytes, DigestError>>();
    let completer = ScriptedCompleter::new(vec![Box::pin(rx_stream), stream_of(&["second"])]);
    let orchestrator = Arc::new(Orchestrator::new(
        FakeExtractor::ok("raw"),
        completer,
        FakeTranslator::ok(""),
    ));
    let mut rx = orchestrator.subscribe();

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(AnalysisRequest::new(PAGE_URL)).await }
    });
    tx.unbounded_send(Ok(Bytes::from("old"))).unwrap();
    rx.wait_for(|s| s.streaming_text == "old").await.unwrap();

    orchestrator
        .submit(AnalysisRequest::new("https://example.com/second"))
        .await
        .unwrap();
    drop(tx);
    first.await.unwrap().unwrap();

    let output = logs.contents();
    assert_eq!(output.matches("Analysis session done").count(), 1);
    assert!(output.contains("Dropping result of a superseded session"));
}
