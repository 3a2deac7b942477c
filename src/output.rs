//! Report types returned by the run entry points.
//!
//! Every type is `Serialize` so the CLI can print a run as JSON
//! (`--json`) for scripting.

use crate::error::DocumentError;
use crate::role::DocumentRole;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one document of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub role: DocumentRole,
    /// Stamped page count; `None` when the document failed.
    pub pages: Option<usize>,
    /// Set when the document was dropped from the chapter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DocumentError>,
}

impl DocumentReport {
    pub fn rendered(role: DocumentRole, pages: usize) -> Self {
        Self {
            role,
            pages: Some(pages),
            error: None,
        }
    }

    pub fn failed(error: DocumentError) -> Self {
        Self {
            role: error.role(),
            pages: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one chapter.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterReport {
    pub number: u32,
    /// Book-chapter title when found, else "Chapter N".
    pub title: String,
    /// Assembled chapter PDF; `None` when no document rendered.
    pub pdf: Option<PathBuf>,
    /// One entry per document present, in role order.
    pub documents: Vec<DocumentReport>,
    /// Pages in the chapter PDF, cover included.
    pub total_pages: usize,
    /// Set when documents rendered but the chapter PDF could not be written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChapterReport {
    pub fn rendered(&self) -> usize {
        self.documents.iter().filter(|d| d.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.documents.len() - self.rendered()
    }
}

/// The course book written at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct CourseReport {
    pub path: PathBuf,
    /// Chapter PDFs included behind the course cover.
    pub chapters: usize,
    /// Pages in the course book, cover included.
    pub pages: usize,
    pub size_bytes: u64,
}

impl CourseReport {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Summary of a `build` or `merge_only` run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub chapters: Vec<ChapterReport>,
    /// `None` when no chapter produced a PDF.
    pub course: Option<CourseReport>,
    pub duration_ms: u64,
}

impl RunReport {
    /// Documents rendered across all chapters.
    pub fn rendered(&self) -> usize {
        self.chapters.iter().map(ChapterReport::rendered).sum()
    }

    /// Documents dropped across all chapters.
    pub fn failed(&self) -> usize {
        self.chapters.iter().map(ChapterReport::failed).sum()
    }

    pub fn errors(&self) -> impl Iterator<Item = (u32, &DocumentError)> {
        self.chapters.iter().flat_map(|c| {
            c.documents
                .iter()
                .filter_map(move |d| d.error.as_ref().map(|e| (c.number, e)))
        })
    }
}

/// Summary of a header-cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Files rewritten.
    pub cleaned: usize,
    /// Files already clean.
    pub skipped: usize,
    /// Files that could not be read or written.
    pub failed: usize,
    pub total: usize,
}
