//! Diagnostic error page shown for unhandled errors outside production.

use crate::{Error, HttpRequest};
use async_trait::async_trait;
use serde::Serialize;

/// One numbered line of source around the failing line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetLine {
    pub line: usize,
    pub content: String,
}

/// Everything a renderer needs to describe an unhandled error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPage {
    pub message: String,
    pub file: Option<String>,
    pub error_line: Option<u32>,
    /// `None` when the source file could not be read
    pub code_snippet: Option<Vec<SnippetLine>>,
    pub stack_trace: Vec<String>,
    pub full_stack_trace: String,
}

impl ErrorPage {
    /// Collect the page data for `error`, reading the offending source file
    /// if it is available.
    pub async fn from_error(error: &Error) -> Self {
        let full_stack_trace = error.backtrace_text().unwrap_or_default();

        let (file, error_line) = match error.location() {
            Some((file, line)) => (Some(file.to_string()), Some(line)),
            None => parse_frames(&full_stack_trace)
                .into_iter()
                .find(|(file, _)| !is_framework_frame(file))
                .map(|(file, line)| (Some(file), Some(line)))
                .unwrap_or((None, None)),
        };

        let code_snippet = match &file {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .ok()
                .map(|source| snippet_window(&source, error_line)),
            None => None,
        };

        Self {
            message: error.to_string(),
            file,
            error_line,
            code_snippet,
            stack_trace: trimmed_stack_trace(&full_stack_trace),
            full_stack_trace,
        }
    }
}

/// Extract `(file, line)` pairs from `at <file>:<line>:<column>` frames.
pub fn parse_frames(trace: &str) -> Vec<(String, u32)> {
    trace
        .lines()
        .filter_map(|line| line.trim().strip_prefix("at "))
        .filter_map(|location| {
            let mut parts = location.rsplitn(3, ':');
            let _column = parts.next()?;
            let line = parts.next()?.parse().ok()?;
            let file = parts.next()?;
            Some((file.to_string(), line))
        })
        .collect()
}

/// The two frames after the first, framework frames removed.
///
/// Each frame is its symbol followed by its location (`app::run at
/// src/main.rs:4:1`) when the backtrace has one.
pub fn trimmed_stack_trace(trace: &str) -> Vec<String> {
    group_frames(trace)
        .into_iter()
        .filter(|frame| !is_framework_frame(frame))
        .skip(1)
        .take(2)
        .collect()
}

/// Join each `N: symbol` line with the `at <location>` lines below it.
fn group_frames(trace: &str) -> Vec<String> {
    let mut frames: Vec<String> = Vec::new();

    for line in trace.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match (line.strip_prefix("at "), frames.last_mut()) {
            (Some(location), Some(frame)) => {
                frame.push_str(" at ");
                frame.push_str(location);
            }
            (Some(location), None) => frames.push(location.to_string()),
            (None, _) => {
                let symbol = line
                    .split_once(": ")
                    .filter(|(index, _)| index.bytes().all(|b| b.is_ascii_digit()))
                    .map_or(line, |(_, symbol)| symbol);
                frames.push(symbol.to_string());
            }
        }
    }

    frames
}

fn is_framework_frame(frame: &str) -> bool {
    frame.contains("trellis_core::")
        || frame.contains(env!("CARGO_MANIFEST_DIR"))
        || frame.contains("trellis-core/src/")
}

/// Lines `[line - 1, line + 2]` (1-based) of `source`, or every line when the
/// failing line is unknown.
pub fn snippet_window(source: &str, line: Option<u32>) -> Vec<SnippetLine> {
    let numbered = source.lines().enumerate().map(|(index, content)| SnippetLine {
        line: index + 1,
        content: content.to_string(),
    });

    match line {
        Some(line) => numbered
            .skip((line as usize).saturating_sub(2))
            .take(4)
            .collect(),
        None => numbered.collect(),
    }
}

/// Turns an [`ErrorPage`] into a document.
#[async_trait]
pub trait ErrorPageRenderer: Send + Sync {
    async fn render(&self, page: &ErrorPage, request: &HttpRequest) -> Result<String, Error>;
}

/// Built-in HTML renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticPageRenderer;

#[async_trait]
impl ErrorPageRenderer for DiagnosticPageRenderer {
    async fn render(&self, page: &ErrorPage, request: &HttpRequest) -> Result<String, Error> {
        let mut html = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&page.message)));
        html.push_str(&format!(
            "<style nonce=\"{}\">body{{font-family:monospace;margin:2rem}}.hl{{background:#fdd}}pre{{white-space:pre-wrap}}</style>\n",
            escape_html(request.nonce())
        ));
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!("<h1>{}</h1>\n", escape_html(&page.message)));
        html.push_str(&format!(
            "<p>{} {}</p>\n",
            escape_html(&request.method),
            escape_html(request.url())
        ));

        if let Some(file) = &page.file {
            let location = match page.error_line {
                Some(line) => format!("{}:{}", file, line),
                None => file.clone(),
            };
            html.push_str(&format!("<h2>{}</h2>\n", escape_html(&location)));
        }

        if let Some(snippet) = &page.code_snippet {
            html.push_str("<pre>");
            for line in snippet {
                let highlighted = page.error_line.map(|l| l as usize) == Some(line.line);
                html.push_str(&format!(
                    "<span{}>{:>5} | {}</span>\n",
                    if highlighted { " class=\"hl\"" } else { "" },
                    line.line,
                    escape_html(&line.content)
                ));
            }
            html.push_str("</pre>\n");
        }

        if !page.stack_trace.is_empty() {
            html.push_str("<ul>\n");
            for frame in &page.stack_trace {
                html.push_str(&format!("<li>{}</li>\n", escape_html(frame)));
            }
            html.push_str("</ul>\n");
        }

        html.push_str(&format!(
            "<details><summary>Full stack trace</summary><pre>{}</pre></details>\n",
            escape_html(&page.full_stack_trace)
        ));
        html.push_str("</body>\n</html>\n");

        Ok(html)
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
