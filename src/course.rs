//! Course assembly: one course cover followed by every chapter PDF.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::layout::{course_stem, CourseLayout};
use crate::output::CourseReport;
use crate::pipeline::{cover, merge, pdf};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Pick the course book path for this run.
///
/// `course-complete_YYYYMMDD.pdf` is used when free. An existing file of
/// that name is deleted when `replace_existing_course` allows it; when it
/// does not, or the deletion fails (e.g. the file is open in a viewer), a
/// `_HHMMSS` suffix is appended instead, plus a counter if even that name
/// is taken. Never fails.
pub fn course_output_path(config: &PipelineConfig, layout: &CourseLayout) -> PathBuf {
    let base = layout.course_pdf(config.generated_on);
    if !base.exists() {
        return base;
    }

    if config.replace_existing_course {
        match std::fs::remove_file(&base) {
            Ok(()) => return base,
            Err(e) => warn!("Cannot replace {}: {}", base.display(), e),
        }
    }

    let stem = format!(
        "{}_{}",
        course_stem(config.generated_on),
        chrono::Local::now().format("%H%M%S")
    );
    let mut candidate = layout.pdf_root().join(format!("{stem}.pdf"));
    let mut n = 2;
    while candidate.exists() {
        candidate = layout.pdf_root().join(format!("{stem}_{n}.pdf"));
        n += 1;
    }
    info!("Previous course book kept, creating: {}", candidate.display());
    candidate
}

/// Build the course book from `chapters` (chapter PDF, chapter title),
/// in the order given.
///
/// Chapter PDFs that no longer exist are skipped with a warning.
pub async fn assemble_course(
    config: &PipelineConfig,
    layout: &CourseLayout,
    chapters: &[(PathBuf, String)],
) -> Result<CourseReport, PipelineError> {
    let inputs: Vec<PathBuf> = chapters
        .iter()
        .filter_map(|(path, title)| {
            if path.exists() {
                Some(path.clone())
            } else {
                warn!("Chapter PDF for '{}' missing at {}; skipping", title, path.display());
                None
            }
        })
        .collect();

    let pdf_root = layout.pdf_root();
    std::fs::create_dir_all(pdf_root).map_err(|e| PipelineError::OutputWriteFailed {
        path: pdf_root.to_path_buf(),
        source: e,
    })?;
    let output = course_output_path(config, layout);

    let pages = {
        let config = config.clone();
        let inputs = inputs.clone();
        let output = output.clone();
        pdf::blocking(move || {
            let cover = cover::make_course_cover(&config, inputs.len())?;
            merge::merge_files(Some(cover), &inputs, &output)
        })
        .await?
    };

    let size_bytes = file_size(&output)?;
    let report = CourseReport {
        path: output,
        chapters: inputs.len(),
        pages,
        size_bytes,
    };
    info!(
        "Created: {} ({:.1} MB)",
        report.path.display(),
        report.size_mb()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_course_complete(&report.path, report.pages);
    }
    Ok(report)
}

fn file_size(path: &Path) -> Result<u64, PipelineError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| PipelineError::io(path, e))
}
