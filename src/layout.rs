//! Filesystem conventions of a course tree.
//!
//! ```text
//! <output_root>/
//!   chapter-01/
//!     book-chapter.md  quiz.md  …
//!     paginated-archive/          render-ready copies, kept for traceability
//!   pdf/                          (<pdf_root>)
//!     chapter-01/
//!       book-chapter.pdf  quiz.pdf  …
//!       chapter-01_complete.pdf
//!     course-complete_20260116.pdf
//! ```

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::role::DocumentRole;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Per-chapter directory receiving render-ready documents after use.
pub const ARCHIVE_DIR: &str = "paginated-archive";

static RE_CHAPTER_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^chapter-(\d+)$").unwrap());

/// Canonical directory name for a chapter number, e.g. `chapter-07`.
pub fn chapter_dir_name(number: u32) -> String {
    format!("chapter-{:02}", number)
}

/// Which chapters a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterSelection {
    /// Every `chapter-NN` directory under the output root.
    All,
    /// Specific chapter numbers, ascending and without repeats.
    Numbers(Vec<u32>),
}

impl ChapterSelection {
    /// Select specific chapters; order and duplicates in `numbers` are ignored.
    pub fn numbers(numbers: impl IntoIterator<Item = u32>) -> Self {
        let mut v: Vec<u32> = numbers.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        Self::Numbers(v)
    }
}

impl fmt::Display for ChapterSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all chapters"),
            Self::Numbers(v) => {
                let list: Vec<String> = v.iter().map(u32::to_string).collect();
                write!(f, "chapters {}", list.join(", "))
            }
        }
    }
}

/// A chapter directory that exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDir {
    pub number: u32,
    pub path: PathBuf,
}

impl ChapterDir {
    /// Directory name, reused for the chapter's PDF directory.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| chapter_dir_name(self.number))
    }

    /// Source Markdown for `role`.
    pub fn source(&self, role: DocumentRole) -> PathBuf {
        self.path.join(role.markdown_name())
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.path.join(ARCHIVE_DIR)
    }
}

/// Output paths derived from a [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct CourseLayout {
    output_root: PathBuf,
    pdf_root: PathBuf,
}

impl CourseLayout {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            output_root: config.output_root.clone(),
            pdf_root: config.pdf_root(),
        }
    }

    pub fn pdf_root(&self) -> &Path {
        &self.pdf_root
    }

    pub fn chapter_pdf_dir(&self, chapter: &ChapterDir) -> PathBuf {
        self.pdf_root.join(chapter.name())
    }

    /// Final (stamped) PDF of one document.
    pub fn document_pdf(&self, chapter: &ChapterDir, role: DocumentRole) -> PathBuf {
        self.chapter_pdf_dir(chapter).join(format!("{}.pdf", role.stem()))
    }

    /// Scratch target for stamping before it replaces [`Self::document_pdf`].
    pub fn numbered_pdf(&self, chapter: &ChapterDir, role: DocumentRole) -> PathBuf {
        self.chapter_pdf_dir(chapter)
            .join(format!("{}_numbered.pdf", role.stem()))
    }

    /// The assembled chapter PDF.
    pub fn chapter_pdf(&self, chapter: &ChapterDir) -> PathBuf {
        self.chapter_pdf_dir(chapter)
            .join(format!("{}_complete.pdf", chapter_dir_name(chapter.number)))
    }

    /// Course book path before any collision suffix.
    pub fn course_pdf(&self, date: NaiveDate) -> PathBuf {
        self.pdf_root.join(format!("{}.pdf", course_stem(date)))
    }

    /// Resolve `selection` to existing chapter directories, ascending.
    ///
    /// Requested chapters without a directory are skipped with a warning;
    /// an empty result is [`PipelineError::NoChapters`].
    pub fn select_chapters(
        &self,
        selection: &ChapterSelection,
    ) -> Result<Vec<ChapterDir>, PipelineError> {
        if !self.output_root.is_dir() {
            return Err(PipelineError::OutputDirMissing {
                path: self.output_root.clone(),
            });
        }

        let chapters = match selection {
            ChapterSelection::All => discover_chapters(&self.output_root)?,
            ChapterSelection::Numbers(numbers) => numbers
                .iter()
                .filter_map(|&number| {
                    let path = self.output_root.join(chapter_dir_name(number));
                    if path.is_dir() {
                        Some(ChapterDir { number, path })
                    } else {
                        warn!("Chapter {} not found at {}; skipping", number, path.display());
                        None
                    }
                })
                .collect(),
        };

        if chapters.is_empty() {
            return Err(PipelineError::NoChapters {
                root: self.output_root.clone(),
                selection: selection.to_string(),
            });
        }
        Ok(chapters)
    }
}

/// File stem of the course book for `date`, e.g. `course-complete_20260116`.
pub fn course_stem(date: NaiveDate) -> String {
    format!("course-complete_{}", date.format("%Y%m%d"))
}

/// Every `chapter-NN` directory directly under `root`, by ascending number.
pub fn discover_chapters(root: &Path) -> Result<Vec<ChapterDir>, PipelineError> {
    let entries = std::fs::read_dir(root).map_err(|e| PipelineError::io(root, e))?;
    let mut chapters: Vec<ChapterDir> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let number = RE_CHAPTER_DIR.captures(&name)?[1].parse().ok()?;
            Some(ChapterDir {
                number,
                path: entry.path(),
            })
        })
        .collect();
    chapters.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.path.cmp(&b.path)));
    Ok(chapters)
}
