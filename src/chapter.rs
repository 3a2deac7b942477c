//! Chapter assembly: run every document of a chapter through the pipeline
//! and merge the results behind a chapter cover.
//!
//! ## Per-document state machine
//!
//! ```text
//! normalize ─▶ prepare ─▶ render ─┬─▶ stamp ─▶ (kept)
//!                                 └─▶ (dropped)
//!        render-ready copy ─────────────────▶ archived
//! ```
//!
//! A failing document is recorded and dropped; the chapter continues with
//! the remaining roles. The render-ready copy is archived whether or not
//! the document rendered.

use crate::config::PipelineConfig;
use crate::error::{DocumentError, PipelineError};
use crate::layout::{chapter_dir_name, ChapterDir, CourseLayout};
use crate::output::{ChapterReport, DocumentReport};
use crate::pipeline::render::Renderer;
use crate::pipeline::{cover, merge, normalize, pdf, prepare, stamp};
use crate::role::DocumentRole;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Moves a render-ready document into the chapter archive when dropped.
///
/// Created as soon as the render-ready file exists, so the file is archived
/// on every exit path of [`process_document`].
struct ArchiveOnDrop {
    file: PathBuf,
    archive_dir: PathBuf,
}

impl Drop for ArchiveOnDrop {
    fn drop(&mut self) {
        let Some(name) = self.file.file_name() else {
            return;
        };
        if !self.file.exists() {
            return;
        }
        let target = self.archive_dir.join(name);
        // An archived copy from an earlier run is replaced.
        if target.exists() {
            if let Err(e) = std::fs::remove_file(&target) {
                debug!("Could not remove old archive copy {}: {}", target.display(), e);
            }
        }
        match std::fs::rename(&self.file, &target) {
            Ok(()) => debug!("Archived {}", target.display()),
            Err(e) => warn!("Could not archive {}: {}", self.file.display(), e),
        }
    }
}

/// Title shown when a chapter has no usable book-chapter heading.
fn default_title(number: u32) -> String {
    format!("Chapter {}", number)
}

/// Assemble one chapter.
///
/// Returns a report whose `pdf` is `None` when no document rendered; that is
/// a "chapter absent" result, not an error. A chapter PDF that cannot be
/// written is recorded in the report's `error` and likewise leaves `pdf`
/// unset. Only failure to create the chapter's output directories is fatal.
pub async fn assemble_chapter<R: Renderer>(
    config: &PipelineConfig,
    layout: &CourseLayout,
    renderer: &R,
    chapter: &ChapterDir,
) -> Result<ChapterReport, PipelineError> {
    let number = chapter.number;
    info!("Processing {}", chapter.name());

    let pdf_dir = layout.chapter_pdf_dir(chapter);
    std::fs::create_dir_all(&pdf_dir).map_err(|e| PipelineError::OutputWriteFailed {
        path: pdf_dir.clone(),
        source: e,
    })?;
    let archive_dir = chapter.archive_dir();
    std::fs::create_dir_all(&archive_dir).map_err(|e| PipelineError::io(&archive_dir, e))?;

    let mut documents = Vec::new();
    let mut stamped: Vec<PathBuf> = Vec::new();
    let mut book_title: Option<String> = None;
    let mut book_rendered = false;

    for role in DocumentRole::ALL {
        let source = chapter.source(role);
        if !source.is_file() {
            continue;
        }
        debug!("Converting {}", source.display());

        let (title, result) = process_document(layout, renderer, chapter, role, &source).await;
        if role == DocumentRole::BookChapter {
            book_title = title;
        }

        let report = match result {
            Ok(pages) => {
                info!("Created {}.pdf ({} pages)", role.stem(), pages);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_complete(number, role, pages);
                }
                if role == DocumentRole::BookChapter {
                    book_rendered = true;
                }
                stamped.push(layout.document_pdf(chapter, role));
                DocumentReport::rendered(role, pages)
            }
            Err(e) => {
                warn!("Chapter {}: {}", number, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_error(number, role, &e.to_string());
                }
                DocumentReport::failed(e)
            }
        };
        documents.push(report);
    }

    let title = book_title.clone().unwrap_or_else(|| default_title(number));

    if stamped.is_empty() {
        warn!("Chapter {}: no documents rendered; no chapter PDF", number);
        if let Some(ref cb) = config.progress_callback {
            cb.on_chapter_complete(number, None);
        }
        return Ok(ChapterReport {
            number,
            title,
            pdf: None,
            documents,
            total_pages: 0,
            error: None,
        });
    }

    let cover_title = match (book_rendered, book_title) {
        (true, Some(t)) => t,
        _ => default_title(number),
    };
    let merged = layout.chapter_pdf(chapter);
    let report = match merge_chapter(config, &pdf_dir, number, cover_title, stamped, &merged).await
    {
        Ok(total_pages) => {
            info!("Merged: {} ({} pages)", merged.display(), total_pages);
            ChapterReport {
                number,
                title,
                pdf: Some(merged),
                documents,
                total_pages,
                error: None,
            }
        }
        // e.g. the previous chapter PDF is held open by a viewer
        Err(e) => {
            warn!("Chapter {}: could not write chapter PDF: {}", number, e);
            ChapterReport {
                number,
                title,
                pdf: None,
                documents,
                total_pages: 0,
                error: Some(e.to_string()),
            }
        }
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_chapter_complete(number, report.pdf.as_deref());
    }
    Ok(report)
}

/// Drive one document through normalize → prepare → render → stamp.
///
/// Returns the extracted title (when the document could be read) alongside
/// the stamped page count or the reason the document was dropped.
async fn process_document<R: Renderer>(
    layout: &CourseLayout,
    renderer: &R,
    chapter: &ChapterDir,
    role: DocumentRole,
    source: &Path,
) -> (Option<String>, Result<usize, DocumentError>) {
    let read_error = |detail: String| DocumentError::Read { role, detail };

    if let Err(e) = normalize::normalize_file(source) {
        warn!("Could not normalise {}: {}; using it as is", source.display(), e);
    }

    let text = match std::fs::read_to_string(source) {
        Ok(t) => t,
        Err(e) => return (None, Err(read_error(format!("{}: {}", source.display(), e)))),
    };
    let (ready_text, title) = prepare::prepare(&text, chapter.number);

    let ready_path = prepare::render_ready_path(source);
    if let Err(e) = std::fs::write(&ready_path, ready_text) {
        return (
            Some(title),
            Err(read_error(format!("{}: {}", ready_path.display(), e))),
        );
    }
    let _archive = ArchiveOnDrop {
        file: ready_path.clone(),
        archive_dir: chapter.archive_dir(),
    };

    let rendered = layout.document_pdf(chapter, role);
    if let Err(e) = renderer.render(&ready_path, &rendered, role).await {
        return (Some(title), Err(e));
    }

    let numbered = layout.numbered_pdf(chapter, role);
    (Some(title), stamp_in_place(rendered, numbered, chapter.number, role).await)
}

/// Stamp `rendered` into `numbered`, then move the result over `rendered`.
async fn stamp_in_place(
    rendered: PathBuf,
    numbered: PathBuf,
    chapter: u32,
    role: DocumentRole,
) -> Result<usize, DocumentError> {
    let stamp_error = |detail: String| DocumentError::Stamp { role, detail };

    pdf::blocking(move || {
        let pages = stamp::stamp(&rendered, &numbered, chapter)?;
        std::fs::rename(&numbered, &rendered).map_err(|e| PipelineError::io(&rendered, e))?;
        Ok(pages)
    })
    .await
    .map_err(|e| stamp_error(e.to_string()))
}

/// Write the cover to a transient file next to the chapter PDFs and merge
/// it with the stamped documents. The cover file is removed afterwards.
async fn merge_chapter(
    config: &PipelineConfig,
    pdf_dir: &Path,
    number: u32,
    cover_title: String,
    stamped: Vec<PathBuf>,
    merged: &Path,
) -> Result<usize, PipelineError> {
    let config = config.clone();
    let pdf_dir = pdf_dir.to_path_buf();
    let merged = merged.to_path_buf();

    pdf::blocking(move || {
        let cover_file = tempfile::Builder::new()
            .prefix(&format!("{}_cover", chapter_dir_name(number)))
            .suffix(".pdf")
            .tempfile_in(&pdf_dir)
            .map_err(|e| PipelineError::OutputWriteFailed {
                path: pdf_dir.clone(),
                source: e,
            })?;

        let mut cover = cover::make_chapter_cover(&config, number, &cover_title)?;
        pdf::save(&mut cover, cover_file.path())?;

        let mut inputs = Vec::with_capacity(stamped.len() + 1);
        inputs.push(cover_file.path().to_path_buf());
        inputs.extend(stamped);
        merge::merge_files(None, &inputs, &merged)
    })
    .await
}
