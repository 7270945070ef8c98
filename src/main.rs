use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use clap::builder::{PossibleValue, PossibleValuesParser, TypedValueParser};
use owo_colors::OwoColorize;
use tokio::sync::watch;
use tracing::debug;

use pagedigest::ai::CompletionClient;
use pagedigest::clients::{ExtractionClient, TranslationClient, build_http_client};
use pagedigest::core::config::AppConfig;
use pagedigest::core::models::{AnalysisRequest, Language};
use pagedigest::errors::DigestError;
use pagedigest::format::{format, render_html_page, render_terminal};
use pagedigest::orchestrator::Orchestrator;
use pagedigest::prompt::{AnalysisMode, SummaryLength};
use pagedigest::session::{Phase, SessionId, SessionState};

/// Output format for the processed content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Html,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            _ => Err(format!("Invalid format: {s}. Valid options: text, html")),
        }
    }
}

/// `--lang` values, listed with each language's own name in `--help`.
fn language_parser() -> impl TypedValueParser<Value = Language> {
    PossibleValuesParser::new(
        Language::ALL.map(|lang| PossibleValue::new(lang.code()).help(lang.native_name())),
    )
    .try_map(|code| code.parse::<Language>())
}

/// Extract a web page and clean it up, summarize it or turn it into bullets
#[derive(Parser, Debug)]
#[command(name = "pagedigest")]
#[command(version)]
#[command(about = "Extract and analyze web page content with a chat model", long_about = None)]
struct Args {
    /// URL of the page to analyze
    #[arg(value_name = "URL")]
    url: String,

    /// Analysis mode (clean, summarize, bullets)
    #[arg(short, long, default_value = "clean", value_name = "MODE")]
    mode: AnalysisMode,

    /// Summary length for summarize mode (short, medium, long)
    #[arg(short, long, default_value = "medium", value_name = "LENGTH")]
    length: SummaryLength,

    /// Output language
    #[arg(long = "lang", default_value = "ar", value_name = "CODE", value_parser = language_parser())]
    language: Language,

    /// Output format (text, html)
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Do not echo the model output to stderr while it streams
    #[arg(long)]
    no_live: bool,

    /// Also show the extracted page text (stderr for text, a section for html)
    #[arg(long)]
    show_original: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

/// Text of `state` that has not been echoed yet, if any.
///
/// Once the session is done the live buffer is cleared, so the tail comes
/// from the final text. That text is only echoed when it is the model output
/// itself: `untranslated` is set, or it extends what was already echoed.
fn pending_echo<'a>(state: &'a SessionState, echoed: &str, untranslated: bool) -> Option<&'a str> {
    let source = if !state.streaming_text.is_empty() {
        &state.streaming_text
    } else if state.phase == Phase::Done && (untranslated || !echoed.is_empty()) {
        &state.processed_text
    } else {
        return None;
    };
    source.strip_prefix(echoed).filter(|rest| !rest.is_empty())
}

/// Echoes the growing buffer of the current session to stderr.
///
/// Returns once the session reaches a terminal phase or the sender is gone,
/// after echoing everything that was published before.
async fn live_view(mut rx: watch::Receiver<SessionState>, styled: bool, untranslated: bool) {
    let mut session: Option<SessionId> = None;
    let mut echoed = String::new();
    let mut stderr = io::stderr();

    while rx.changed().await.is_ok() {
        let (delta, finished) = {
            let state = rx.borrow_and_update();
            if session != Some(state.id) {
                session = Some(state.id);
                echoed.clear();
            }
            let delta = pending_echo(&state, &echoed, untranslated).map(str::to_owned);
            (delta, state.phase.is_terminal())
        };

        if let Some(delta) = delta {
            let written = if styled {
                write!(stderr, "{}", delta.dimmed())
            } else {
                write!(stderr, "{delta}")
            };
            if let Err(e) = written.and_then(|()| stderr.flush()) {
                debug!(error = %e, "Live output stopped");
                return;
            }
            echoed.push_str(&delta);
        }
        if finished {
            return;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    pagedigest::setup_logging();

    let config = AppConfig::from_env()
        .map_err(DigestError::Config)
        .context("Failed to load configuration")?;
    let http = build_http_client()?;

    let orchestrator = Orchestrator::new(
        ExtractionClient::from_config(http.clone(), &config),
        CompletionClient::from_config(http.clone(), &config),
        TranslationClient::from_config(http, &config),
    )
    .with_source_language(config.source_language);

    let colors = !args.no_color && io::stderr().is_terminal();
    let untranslated = args.language == config.source_language;
    let live = (!args.no_live)
        .then(|| tokio::spawn(live_view(orchestrator.subscribe(), colors, untranslated)));

    let request = AnalysisRequest::new(args.url.clone())
        .with_mode(args.mode)
        .with_summary_length(args.length)
        .with_target_language(args.language);
    let result = orchestrator.submit(request).await;
    let state = orchestrator.snapshot();
    // Closing the channel lets the live view drain and return.
    drop(orchestrator);

    if let Some(handle) = live {
        if let Err(e) = handle.await {
            debug!(error = %e, "Live output task failed");
        }
        eprintln!();
    }

    result.context("Analysis failed")?;

    let shown_language = if let Some(warning) = &state.error {
        eprintln!("{} {}", "⚠".yellow(), warning.bright_yellow());
        config.source_language
    } else {
        args.language
    };

    let doc = format(state.display_text());
    if doc.is_blank() {
        eprintln!("{} {}", "⚠".yellow(), "The analysis returned no content".bright_yellow());
    }

    let original = args.show_original.then_some(state.raw_text.as_str());
    let output = match args.format {
        OutputFormat::Html => render_html_page(&doc, shown_language, original),
        OutputFormat::Text => {
            if let Some(raw) = original {
                eprintln!("{}\n{raw}\n", "Original content".bold());
            }
            let styled = !args.no_color && args.output.is_none() && io::stdout().is_terminal();
            render_terminal(&doc, styled) + "\n"
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("Failed to write to file: {}", path.display()))?;
            eprintln!("{} {}", "✓".green(), format!("Wrote {}", path.display()).bright_green());
        }
        None => {
            io::stdout()
                .write_all(output.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(phase: Phase, streaming: &str, processed: &str) -> SessionState {
        SessionState {
            phase,
            streaming_text: streaming.to_string(),
            processed_text: processed.to_string(),
            ..SessionState::default()
        }
    }

    #[test]
    fn test_pending_echo_while_streaming() {
        let s = state(Phase::Generating, "### عنوان\nنص", "");
        assert_eq!(pending_echo(&s, "", false), Some("### عنوان\nنص"));
        assert_eq!(pending_echo(&s, "### عنوان\n", false), Some("نص"));
        assert_eq!(pending_echo(&s, "### عنوان\nنص", false), None);
    }

    #[test]
    fn test_pending_echo_recovers_tail_after_done() {
        let s = state(Phase::Done, "", "first second");
        assert_eq!(pending_echo(&s, "first ", false), Some("second"));
        assert_eq!(pending_echo(&s, "", true), Some("first second"));
    }

    #[test]
    fn test_pending_echo_skips_translated_result() {
        let s = state(Phase::Done, "", "translated text");
        assert_eq!(pending_echo(&s, "نص", false), None);
        assert_eq!(pending_echo(&s, "", false), None);
    }

    #[test]
    fn test_language_values_use_codes() {
        let parser = language_parser();
        let values: Vec<String> = parser
            .possible_values()
            .into_iter()
            .flatten()
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(values, ["ar", "en", "fr", "es", "de"]);
    }
}
