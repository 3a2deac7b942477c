//! Top-level entry points.
//!
//! * [`build`] — regenerate the selected chapters and the course book.
//! * [`merge_only`] — skip regeneration; assemble the course book from the
//!   chapter PDFs already on disk.
//! * [`normalize_tree`] — run only the header cleanup over chapter sources.
//!
//! All three resolve the chapter selection first; an empty selection is the
//! only fatal outcome before any work starts. Chapters and documents are
//! processed one at a time, in ascending chapter order.

use crate::chapter::assemble_chapter;
use crate::config::PipelineConfig;
use crate::course::assemble_course;
use crate::error::PipelineError;
use crate::layout::{ChapterDir, ChapterSelection, CourseLayout};
use crate::output::{ChapterReport, NormalizeReport, RunReport};
use crate::pipeline::normalize::{normalize_file, NormalizeOutcome};
use crate::pipeline::render::{PandocRenderer, Renderer};
use crate::pipeline::{pdf, prepare};
use crate::role::DocumentRole;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Build the selected chapters with the configured converter, then the
/// course book.
///
/// # Errors
/// Returns `Err(PipelineError)` only for fatal errors:
/// - the output root is missing or no chapter matched the selection
/// - a chapter PDF or the course book could not be written
///
/// Failed documents are reported in the returned [`RunReport`].
pub async fn build(
    config: &PipelineConfig,
    selection: &ChapterSelection,
) -> Result<RunReport, PipelineError> {
    build_with(config, selection, &PandocRenderer::from_config(config)).await
}

/// [`build`] with a caller-supplied [`Renderer`].
pub async fn build_with<R: Renderer>(
    config: &PipelineConfig,
    selection: &ChapterSelection,
    renderer: &R,
) -> Result<RunReport, PipelineError> {
    let start = Instant::now();
    let layout = CourseLayout::new(config);
    let chapters = layout.select_chapters(selection)?;
    info!("Processing {} chapter(s)", chapters.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(chapters.len());
    }

    let mut reports = Vec::with_capacity(chapters.len());
    for chapter in &chapters {
        if let Some(ref cb) = config.progress_callback {
            cb.on_chapter_start(chapter.number, chapters.len());
        }
        reports.push(assemble_chapter(config, &layout, renderer, chapter).await?);
    }

    finish(config, &layout, reports, start).await
}

/// Assemble the course book from chapter PDFs built by an earlier run.
///
/// Chapter titles are recovered from each chapter's `book-chapter.md`.
/// Chapters without a chapter PDF are reported but not included.
pub async fn merge_only(
    config: &PipelineConfig,
    selection: &ChapterSelection,
) -> Result<RunReport, PipelineError> {
    let start = Instant::now();
    let layout = CourseLayout::new(config);
    let chapters = layout.select_chapters(selection)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(chapters.len());
    }

    let mut reports = Vec::with_capacity(chapters.len());
    for chapter in &chapters {
        if let Some(ref cb) = config.progress_callback {
            cb.on_chapter_start(chapter.number, chapters.len());
        }
        let report = existing_chapter(&layout, chapter).await;
        if let Some(ref cb) = config.progress_callback {
            cb.on_chapter_complete(chapter.number, report.pdf.as_deref());
        }
        reports.push(report);
    }

    finish(config, &layout, reports, start).await
}

/// Report for a chapter whose PDF was built by an earlier run.
async fn existing_chapter(layout: &CourseLayout, chapter: &ChapterDir) -> ChapterReport {
    let title = std::fs::read_to_string(chapter.source(DocumentRole::BookChapter))
        .map(|text| prepare::extract_title(&text))
        .unwrap_or_else(|_| format!("Chapter {}", chapter.number));

    let merged = layout.chapter_pdf(chapter);
    let mut report = ChapterReport {
        number: chapter.number,
        title,
        pdf: None,
        documents: Vec::new(),
        total_pages: 0,
        error: None,
    };
    if !merged.exists() {
        warn!("No chapter PDF at {}; skipping", merged.display());
        return report;
    }

    let path = merged.clone();
    match pdf::blocking(move || pdf::page_count(&path)).await {
        Ok(pages) => {
            report.pdf = Some(merged);
            report.total_pages = pages;
        }
        Err(e) => warn!("Unreadable chapter PDF, skipping: {}", e),
    }
    report
}

/// Write the course book from every chapter that produced a PDF.
async fn finish(
    config: &PipelineConfig,
    layout: &CourseLayout,
    chapters: Vec<ChapterReport>,
    start: Instant,
) -> Result<RunReport, PipelineError> {
    let built: Vec<(PathBuf, String)> = chapters
        .iter()
        .filter_map(|c| c.pdf.clone().map(|p| (p, c.title.clone())))
        .collect();

    let course = if built.is_empty() {
        warn!("No chapter PDFs available; course book not created");
        None
    } else {
        Some(assemble_course(config, layout, &built).await?)
    };

    Ok(RunReport {
        chapters,
        course,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Run the header cleanup over every Markdown source of the selected
/// chapters, rewriting only files whose text changes.
///
/// Render-ready copies (`*_paginated.md`) are left alone. A file that
/// cannot be read or written is counted as failed and the pass continues.
pub async fn normalize_tree(
    config: &PipelineConfig,
    selection: &ChapterSelection,
) -> Result<NormalizeReport, PipelineError> {
    let layout = CourseLayout::new(config);
    let chapters = layout.select_chapters(selection)?;
    let mut report = NormalizeReport::default();

    for chapter in &chapters {
        info!("Cleaning {}", chapter.name());
        for file in markdown_sources(chapter)? {
            report.total += 1;
            match normalize_file(&file) {
                Ok(NormalizeOutcome::Cleaned { .. }) => report.cleaned += 1,
                Ok(NormalizeOutcome::Unchanged) => report.skipped += 1,
                Err(e) => {
                    warn!("Could not normalise {}: {}", file.display(), e);
                    report.failed += 1;
                }
            }
        }
    }

    info!("Complete: {}/{} files cleaned", report.cleaned, report.total);
    Ok(report)
}

/// `*.md` files directly inside a chapter directory, sorted by name.
fn markdown_sources(chapter: &ChapterDir) -> Result<Vec<PathBuf>, PipelineError> {
    let entries =
        std::fs::read_dir(&chapter.path).map_err(|e| PipelineError::io(&chapter.path, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            name.ends_with(".md")
                && !name.ends_with(&format!("{}.md", prepare::RENDER_READY_SUFFIX))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Synchronous wrapper around [`build`] that creates its own Tokio runtime.
///
/// Do not call from within an existing Tokio runtime; use [`build`] instead.
pub fn build_sync(
    config: &PipelineConfig,
    selection: &ChapterSelection,
) -> Result<RunReport, PipelineError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PipelineError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build(config, selection))
}
