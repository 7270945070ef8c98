/// pagedigest - scrape a web page, rework its text with a hosted chat model
/// and show the streamed result as formatted output.
///
/// # Architecture
///
/// A session runs three external collaborators in order:
/// - an extraction service turns the URL into plain text
/// - a chat-completion service rewrites the text with one of three fixed
///   instructions and streams the result back
/// - a translation service runs when the requested output language differs
///   from the language the model writes in
///
/// The streamed body is accumulated by [`ai::StreamAggregator`], formatted by
/// [`format::format`] and tracked by the id-guarded [`session::SessionState`]
/// that [`orchestrator::Orchestrator`] publishes to observers.
///
/// # Example
///
/// ```no_run
/// use pagedigest::ai::CompletionClient;
/// use pagedigest::clients::{ExtractionClient, TranslationClient, build_http_client};
/// use pagedigest::core::config::AppConfig;
/// use pagedigest::core::models::AnalysisRequest;
/// use pagedigest::orchestrator::Orchestrator;
/// use pagedigest::prompt::AnalysisMode;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     pagedigest::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let http = build_http_client()?;
///     let orchestrator = Orchestrator::new(
///         ExtractionClient::from_config(http.clone(), &config),
///         CompletionClient::from_config(http.clone(), &config),
///         TranslationClient::from_config(http, &config),
///     )
///     .with_source_language(config.source_language);
///
///     let request = AnalysisRequest::new("https://example.com/article")
///         .with_mode(AnalysisMode::Summarize);
///     orchestrator.submit(request).await?;
///
///     let state = orchestrator.snapshot();
///     println!("{}", pagedigest::format::render_html(&pagedigest::format::format(state.display_text())));
///     Ok(())
/// }
/// ```
// Module declarations
pub mod ai;
pub mod clients;
pub mod core;
pub mod errors;
pub mod format;
pub mod orchestrator;
pub mod prompt;
pub mod session;

/// Configure structured logging with JSON format on stderr.
///
/// Stdout is left to the formatted output. Calling this more than once is a
/// no-op.
///
/// # Example
///
/// ```
/// pagedigest::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    let level = if cfg!(feature = "debug-logs") {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(fmt_layer.with_filter(level))
        .try_init();
}
