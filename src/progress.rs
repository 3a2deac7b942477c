//! Progress-callback trait for per-chapter and per-document events.
//!
//! Inject an [`Arc<dyn PipelineProgress>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks through chapters and their documents.
//!
//! # Example
//!
//! ```rust
//! use course_pdf::{DocumentRole, PipelineConfig, PipelineProgress};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl PipelineProgress for PageCounter {
//!     fn on_document_complete(&self, chapter: u32, role: DocumentRole, pages: usize) {
//!         self.pages.fetch_add(pages, Ordering::SeqCst);
//!         eprintln!("chapter {chapter}: {role} has {pages} pages");
//!     }
//! }
//!
//! let counter = Arc::new(PageCounter { pages: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgress>)
//!     .build()
//!     .unwrap();
//! ```

use crate::role::DocumentRole;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it processes chapters and documents.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive strictly in order: the pipeline never
/// works on two documents at once.
pub trait PipelineProgress: Send + Sync {
    /// Called once after the chapter selection has been resolved.
    fn on_run_start(&self, chapters: usize) {
        let _ = chapters;
    }

    /// Called before the first document of a chapter is touched.
    ///
    /// # Arguments
    /// * `chapter` — chapter number
    /// * `total`   — number of chapters in this run
    fn on_chapter_start(&self, chapter: u32, total: usize) {
        let _ = (chapter, total);
    }

    /// Called when a document has been rendered and stamped.
    fn on_document_complete(&self, chapter: u32, role: DocumentRole, pages: usize) {
        let _ = (chapter, role, pages);
    }

    /// Called when a document is dropped from its chapter.
    fn on_document_error(&self, chapter: u32, role: DocumentRole, error: &str) {
        let _ = (chapter, role, error);
    }

    /// Called once all documents of a chapter were attempted.
    ///
    /// `merged` is the chapter PDF, or `None` when no document rendered.
    fn on_chapter_complete(&self, chapter: u32, merged: Option<&Path>) {
        let _ = (chapter, merged);
    }

    /// Called after the course book has been written.
    fn on_course_complete(&self, path: &Path, pages: usize) {
        let _ = (path, pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgress;

impl PipelineProgress for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgress>;
