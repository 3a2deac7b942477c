//! # course-pdf
//!
//! Turn chapter-organised Markdown course material into numbered chapter
//! PDFs and a single course book.
//!
//! ## Why this crate?
//!
//! A course generator leaves seven Markdown documents per chapter (book
//! chapter, exercises, instructor keys, quiz, Q&A, topics, slides). Handing
//! them to students means converting each one, numbering every page so
//! "see 3.12" points somewhere, putting a cover in front of each chapter and
//! binding the lot into one file. This crate does that end to end: the
//! Markdown-to-PDF step is delegated to an external converter (pandoc by
//! default), everything after it (labelling, covers, merging) is done in pure
//! Rust with `lopdf`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! output/chapter-NN/*.md
//!  │
//!  ├─ 1. Normalize  drop duplicated chapter headers, collapse blank runs
//!  ├─ 2. Prepare    title + render-ready copy (<role>_paginated.md)
//!  ├─ 3. Render     external converter, full attempt then fallback
//!  ├─ 4. Stamp      "<chapter>.<page>" label centred at the page bottom
//!  ├─ 5. Chapter    cover + stamped documents → chapter-NN_complete.pdf
//!  └─ 6. Course     course cover + every chapter → course-complete_YYYYMMDD.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use course_pdf::{build, ChapterSelection, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .output_root("output")
//!         .course_title("Systems Programming")
//!         .build()?;
//!     let report = build(&config, &ChapterSelection::All).await?;
//!     eprintln!("{} documents rendered, {} failed", report.rendered(), report.failed());
//!     if let Some(course) = report.course {
//!         println!("{} ({} pages)", course.path.display(), course.pages);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `course-pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! course-pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Failure Model
//!
//! A document that fails to render is dropped from its chapter and reported;
//! the chapter is still assembled from whatever rendered. Only problems that
//! make the run meaningless (no chapters found, an output file that cannot
//! be written) surface as `Err(PipelineError)`.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chapter;
pub mod config;
pub mod course;
pub mod error;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod role;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chapter::assemble_chapter;
pub use config::{PipelineConfig, PipelineConfigBuilder, DEFAULT_COURSE_TITLE};
pub use course::{assemble_course, course_output_path};
pub use error::{DocumentError, PipelineError};
pub use layout::{ChapterDir, ChapterSelection, CourseLayout};
pub use output::{ChapterReport, CourseReport, DocumentReport, NormalizeReport, RunReport};
pub use pipeline::render::{PandocRenderer, Renderer};
pub use progress::{NoopProgress, PipelineProgress, ProgressCallback};
pub use role::DocumentRole;
pub use run::{build, build_sync, build_with, merge_only, normalize_tree};
