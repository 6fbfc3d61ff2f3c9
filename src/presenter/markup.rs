//! Lightweight emphasis markup used in backend prose.
//!
//! Only one construct is recognised: `**text**` marks a bold run. Everything
//! else, including stray or unmatched `**`, is kept as literal text.

use console::style;
use regex::Regex;
use std::sync::LazyLock;

static BOLD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

/// A run of text with uniform emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Bold(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Plain(t) | Span::Bold(t) => t,
        }
    }
}

/// Split `text` into plain and bold spans.
///
/// Empty input yields no spans. Markers that do not pair up stay in the
/// surrounding plain span.
pub fn parse_bold(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    for cap in BOLD_REGEX.captures_iter(text) {
        let (Some(whole), Some(inner)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            spans.push(Span::Plain(text[cursor..whole.start()].to_string()));
        }
        spans.push(Span::Bold(inner.as_str().to_string()));
        cursor = whole.end();
    }

    if cursor < text.len() {
        spans.push(Span::Plain(text[cursor..].to_string()));
    }
    spans
}

/// Render spans as terminal text, bolding the emphasised runs.
pub fn render(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Span::Plain(t) => t.clone(),
            Span::Bold(t) => style(t).bold().to_string(),
        })
        .collect()
}

/// Render spans with the markers removed and no styling.
pub fn plain(spans: &[Span]) -> String {
    spans.iter().map(Span::text).collect()
}

/// `parse_bold` followed by `render`.
pub fn to_terminal(text: &str) -> String {
    render(&parse_bold(text))
}
