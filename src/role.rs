//! The fixed set of documents a chapter directory can hold.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the seven document categories of a chapter.
///
/// Variants are declared in processing order; [`DocumentRole::ALL`] and the
/// derived `Ord` both follow it, so a chapter's pages are always laid out
/// book-chapter first and powerpoint last regardless of directory listing
/// order. Absent documents are skipped, never reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentRole {
    BookChapter,
    Exercises,
    InstructorKeys,
    Quiz,
    Qa,
    Topics,
    Powerpoint,
}

impl DocumentRole {
    /// Every role, in processing order.
    pub const ALL: [DocumentRole; 7] = [
        DocumentRole::BookChapter,
        DocumentRole::Exercises,
        DocumentRole::InstructorKeys,
        DocumentRole::Quiz,
        DocumentRole::Qa,
        DocumentRole::Topics,
        DocumentRole::Powerpoint,
    ];

    /// File stem shared by the source Markdown and the per-role PDF.
    pub fn stem(self) -> &'static str {
        match self {
            DocumentRole::BookChapter => "book-chapter",
            DocumentRole::Exercises => "exercises",
            DocumentRole::InstructorKeys => "instructor-keys",
            DocumentRole::Quiz => "quiz",
            DocumentRole::Qa => "qa",
            DocumentRole::Topics => "topics",
            DocumentRole::Powerpoint => "powerpoint",
        }
    }

    /// Source file name inside a chapter directory, e.g. `quiz.md`.
    pub fn markdown_name(self) -> String {
        format!("{}.md", self.stem())
    }
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}
