//! Document preparation: give a chapter document the front matter the
//! converter expects.
//!
//! Any prologue already present is replaced, so preparing an already
//! prepared document yields the same text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Title used when a document has no top-level heading.
pub const UNTITLED: &str = "Untitled Chapter";

/// Delimiter opening and closing the front-matter prologue.
const PROLOGUE_DELIMITER: &str = "---";

/// Suffix appended to the source stem for the render-ready copy.
pub const RENDER_READY_SUFFIX: &str = "_paginated";

static RE_TOP_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());

/// Extract the text of the first top-level heading.
///
/// Falls back to [`UNTITLED`] when the document has none.
pub fn extract_title(text: &str) -> String {
    RE_TOP_HEADING
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Drop a leading front-matter prologue, if any.
fn strip_prologue(text: &str) -> &str {
    let Some(rest) = text.strip_prefix(PROLOGUE_DELIMITER) else {
        return text;
    };
    match rest.find(PROLOGUE_DELIMITER) {
        Some(end) => rest[end + PROLOGUE_DELIMITER.len()..].trim_start(),
        None => text,
    }
}

fn escape_yaml(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Front matter: document title, layout class, margins and base font size.
fn prologue(chapter: u32, title: &str) -> String {
    format!(
        "---\n\
         title: \"Chapter {chapter}: {}\"\n\
         documentclass: report\n\
         geometry: margin=1in\n\
         fontsize: 11pt\n\
         ---\n\n",
        escape_yaml(title)
    )
}

/// Build the render-ready text for a document of `chapter`.
///
/// Returns the composed text and the extracted title. Nothing is written;
/// the caller persists the text next to the source under
/// [`render_ready_path`].
pub fn prepare(text: &str, chapter: u32) -> (String, String) {
    let title = extract_title(text);
    let body = strip_prologue(text);
    let mut out = prologue(chapter, &title);
    out.push_str(body);
    (out, title)
}

/// Path of the render-ready copy of `source`, e.g. `quiz.md` → `quiz_paginated.md`.
pub fn render_ready_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}{RENDER_READY_SUFFIX}.md"))
}
