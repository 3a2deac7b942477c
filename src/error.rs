//! Error types for the course-pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`] — **Fatal**: the run cannot proceed at all (no chapter
//!   directories, unreadable output tree, invalid configuration). Returned as
//!   `Err(PipelineError)` from the top-level `run::*` functions before any
//!   work begins, or when an artifact the run must produce cannot be written.
//!
//! * [`DocumentError`] — **Non-fatal**: a single document failed (converter
//!   error, timeout, unreadable source) but the rest of the chapter is fine.
//!   Stored inside [`crate::output::DocumentReport`] so the operator sees a
//!   summary instead of losing the whole chapter to one bad document.

use crate::role::DocumentRole;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the course-pdf library.
///
/// Document-level failures use [`DocumentError`] and are stored in
/// [`crate::output::DocumentReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The configured output root does not exist or is not a directory.
    #[error("Output directory not found: '{path}'\nPass --output-dir pointing at the folder holding chapter-NN directories.")]
    OutputDirMissing { path: PathBuf },

    /// The chapter selection resolved to zero existing chapter directories.
    #[error("No chapter directories found under '{root}' for {selection}")]
    NoChapters { root: PathBuf, selection: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// A PDF could not be loaded, built or serialised.
    #[error("PDF error for '{path}': {detail}")]
    Pdf { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other filesystem failure tied to a path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub(crate) fn pdf(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        Self::Pdf {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A non-fatal error for a single document of a chapter.
///
/// The chapter continues with its remaining documents; the failed document
/// simply contributes no pages.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The source or render-ready Markdown could not be read or written.
    #[error("{role}: cannot prepare document: {detail}")]
    Read { role: DocumentRole, detail: String },

    /// The converter exited non-zero (or could not start) on both the full
    /// and the fallback invocation.
    #[error("{role}: converter failed: {detail}")]
    ConverterFailed { role: DocumentRole, detail: String },

    /// The converter did not finish within the configured ceiling.
    #[error("{role}: converter timed out after {secs}s")]
    ConverterTimeout { role: DocumentRole, secs: u64 },

    /// The rendered PDF could not be page-stamped.
    #[error("{role}: page numbering failed: {detail}")]
    Stamp { role: DocumentRole, detail: String },
}

impl DocumentError {
    /// The role of the document that failed.
    pub fn role(&self) -> DocumentRole {
        match self {
            Self::Read { role, .. }
            | Self::ConverterFailed { role, .. }
            | Self::ConverterTimeout { role, .. }
            | Self::Stamp { role, .. } => *role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_chapters_display() {
        let e = PipelineError::NoChapters {
            root: PathBuf::from("/tmp/course"),
            selection: "chapters 4, 9".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("/tmp/course"), "got: {msg}");
        assert!(msg.contains("chapters 4, 9"), "got: {msg}");
    }

    #[test]
    fn timeout_display_names_role_and_ceiling() {
        let e = DocumentError::ConverterTimeout {
            role: DocumentRole::Topics,
            secs: 120,
        };
        assert_eq!(e.to_string(), "topics: converter timed out after 120s");
        assert_eq!(e.role(), DocumentRole::Topics);
    }

    #[test]
    fn document_error_serialises() {
        let e = DocumentError::ConverterFailed {
            role: DocumentRole::Quiz,
            detail: "exit status 43".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("quiz"), "got: {json}");
    }
}
