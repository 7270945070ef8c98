//! Renderers for [`Document`](super::Document).

use owo_colors::OwoColorize;

use super::{Block, Document, Inline};
use crate::core::models::Language;

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn inlines_to_html(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|inline| match inline {
            Inline::Text(t) => escape_html(t),
            Inline::Strong(t) => format!("<strong>{}</strong>", escape_html(t)),
        })
        .collect()
}

/// Renders the document as an HTML fragment, one element per line.
///
/// All text is escaped. Consecutive list items share one `<ul>`.
#[must_use]
pub fn render_html(doc: &Document) -> String {
    let mut lines = Vec::with_capacity(doc.blocks().len());
    let mut in_list = false;

    for block in doc.blocks() {
        let is_item = matches!(block, Block::ListItem(_));
        if in_list && !is_item {
            lines.push("</ul>".to_string());
        } else if !in_list && is_item {
            lines.push("<ul>".to_string());
        }
        in_list = is_item;

        lines.push(match block {
            Block::Heading { level, text } => {
                let tag = if *level <= 1 { "h1" } else { "h2" };
                format!("<{tag}>{}</{tag}>", escape_html(text))
            }
            Block::ListItem(text) => format!("<li>{}</li>", escape_html(text)),
            Block::Paragraph(inlines) => format!("<p>{}</p>", inlines_to_html(inlines)),
            Block::Break => "<br/>".to_string(),
        });
    }
    if in_list {
        lines.push("</ul>".to_string());
    }

    lines.join("\n")
}

/// Wraps [`render_html`] in a standalone page with the language's direction.
///
/// With `original`, the extracted page text follows the result in its own
/// `<section>`, escaped and with its whitespace preserved.
#[must_use]
pub fn render_html_page(doc: &Document, language: Language, original: Option<&str>) -> String {
    let dir = if language == Language::Arabic { "rtl" } else { "ltr" };
    let original = original
        .map(|text| {
            format!(
                "\n<section class=\"original\">\n<h2>Original content</h2>\n<pre dir=\"auto\">{}</pre>\n</section>",
                escape_html(text)
            )
        })
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\" dir=\"{dir}\">\n<head>\n<meta charset=\"utf-8\">\n<title>pagedigest</title>\n</head>\n<body>\n<section class=\"result\">\n{body}\n</section>{original}\n</body>\n</html>\n",
        lang = language.code(),
        body = render_html(doc),
    )
}

/// Renders the document for a terminal. With `styled` off the output is
/// plain text without any escape sequences.
#[must_use]
pub fn render_terminal(doc: &Document, styled: bool) -> String {
    doc.blocks()
        .iter()
        .map(|block| match block {
            Block::Heading { level: 1, text } if styled => text.bold().underline().to_string(),
            Block::Heading { text, .. } if styled => text.bold().to_string(),
            Block::Heading { text, .. } => text.clone(),
            Block::ListItem(text) => format!("  • {text}"),
            Block::Paragraph(inlines) => inlines
                .iter()
                .map(|inline| match inline {
                    Inline::Text(t) => t.clone(),
                    Inline::Strong(t) if styled => t.bold().to_string(),
                    Inline::Strong(t) => t.clone(),
                })
                .collect(),
            Block::Break => String::new(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
