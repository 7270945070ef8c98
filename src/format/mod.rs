//! Line-oriented formatter for the model output.
//!
//! The model is asked to mark headings with `###`/`##`, bullets with `*` and
//! important words with `**`. [`format`] turns such text into a [`Document`]
//! tree; the [`render`] module maps the tree to HTML or terminal text.

pub mod render;

use once_cell::sync::Lazy;
use regex::Regex;

pub use render::{render_html, render_html_page, render_terminal};

static STRONG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("static regex compile"));

/// Inline content of a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(String),
}

/// One formatted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `### ` is level 1, `## ` is level 2.
    Heading { level: u8, text: String },
    ListItem(String),
    Paragraph(Vec<Inline>),
    /// Produced by a blank line.
    Break,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[must_use]
    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// True when there is nothing but breaks.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.blocks.iter().all(|b| matches!(b, Block::Break))
    }
}

impl From<Vec<Block>> for Document {
    fn from(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }
}

/// Formats `text` line by line. Pure; the same input always gives the same
/// tree, and partial buffers can be formatted while a stream is running.
#[must_use]
pub fn format(text: &str) -> Document {
    text.split('\n')
        .map(|line| format_line(line.strip_suffix('\r').unwrap_or(line)))
        .collect::<Vec<_>>()
        .into()
}

fn format_line(line: &str) -> Block {
    if let Some(rest) = line.strip_prefix("### ") {
        return Block::Heading {
            level: 1,
            text: rest.to_string(),
        };
    }
    if let Some(rest) = line.strip_prefix("## ") {
        return Block::Heading {
            level: 2,
            text: rest.to_string(),
        };
    }
    if let Some(rest) = line.strip_prefix("* ") {
        return Block::ListItem(rest.to_string());
    }
    if line.trim().is_empty() {
        return Block::Break;
    }
    Block::Paragraph(parse_inlines(line))
}

/// Splits a line on `**...**` spans. Pairing is leftmost and non-greedy, so
/// nested markers are not understood and an unpaired `**` stays literal.
fn parse_inlines(line: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    let mut last = 0;

    for caps in STRONG_RE.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            inlines.push(Inline::Text(line[last..whole.start()].to_string()));
        }
        inlines.push(Inline::Strong(inner.as_str().to_string()));
        last = whole.end();
    }

    if last < line.len() {
        inlines.push(Inline::Text(line[last..].to_string()));
    }
    inlines
}
