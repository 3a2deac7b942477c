//! Header normalisation: remove metadata blocks duplicated by repeated
//! formatting passes.
//!
//! Generated chapter documents tend to accumulate copies of the same
//! preamble (`# Book Chapter - Chapter 3`, `**Generated:** …`, `# ====`
//! rules) every time a formatter runs over them. [`normalize`] strips those
//! copies line by line, keeps the first real `#` title, and collapses runs of
//! blank lines and horizontal rules.
//!
//! The per-line metadata patterns live in a declarative table ([`RULES`]);
//! adding a new pattern means adding a row, not touching the scan loop.
//!
//! The function is idempotent: `normalize(normalize(x)) == normalize(x)`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// What to do with a line matched by a [`HeaderRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineAction {
    /// Always drop the line.
    Drop,
    /// Drop the line once the document's real title has been seen.
    DropAfterTitle,
    /// Keep the first occurrence of this marker, drop every repeat.
    KeepFirst(Marker),
}

/// Bold metadata lines that survive exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    ChapterInfo,
    Generated,
    Component,
}

impl Marker {
    fn slot(self) -> usize {
        match self {
            Marker::ChapterInfo => 0,
            Marker::Generated => 1,
            Marker::Component => 2,
        }
    }
}

struct HeaderRule {
    pattern: Regex,
    action: LineAction,
}

impl HeaderRule {
    fn new(pattern: &str, action: LineAction) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            action,
        }
    }
}

/// Metadata line rules, matched against the trimmed line in table order.
/// The first matching row decides.
static RULES: Lazy<Vec<HeaderRule>> = Lazy::new(|| {
    vec![
        // stale copy of the chapter title, e.g. "# Book Chapter - Chapter 3"
        HeaderRule::new(r"^#\s*Book Chapter\s*-\s*Chapter\s*\d+", LineAction::Drop),
        HeaderRule::new(r"(?i)^#\s*Generated:", LineAction::Drop),
        HeaderRule::new(r"^#\s*=+\s*$", LineAction::Drop),
        HeaderRule::new(r"^#\s*Chapter\s*\d+:", LineAction::DropAfterTitle),
        HeaderRule::new(r"^\*\*Chapter.*:", LineAction::KeepFirst(Marker::ChapterInfo)),
        HeaderRule::new(r"^\*\*Generated:", LineAction::KeepFirst(Marker::Generated)),
        HeaderRule::new(r"^\*\*Component:", LineAction::KeepFirst(Marker::Component)),
    ]
});

/// `#` headings that are metadata rather than the document's real title.
static RE_METADATA_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#\s*(Book Chapter|Generated|=+|Chapter\s*\d+:)").unwrap());

static RE_EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Scan state carried across lines.
#[derive(Default)]
struct ScanState {
    seen_title: bool,
    seen_marker: [bool; 3],
    hr_run: usize,
    blank_run: usize,
}

impl ScanState {
    /// Decide whether `line` survives. Updates the state either way.
    fn keep(&mut self, line: &str) -> bool {
        let stripped = line.trim();

        let matched = RULES.iter().find(|r| r.pattern.is_match(stripped));
        match matched.map(|r| r.action) {
            Some(LineAction::Drop) => return false,
            Some(LineAction::DropAfterTitle) if self.seen_title => return false,
            _ => {}
        }

        // Only one real top-level title survives.
        if stripped.starts_with("# ") && !RE_METADATA_HEADING.is_match(stripped) {
            if self.seen_title {
                return false;
            }
            self.seen_title = true;
        }

        if let Some(LineAction::KeepFirst(marker)) = matched.map(|r| r.action) {
            let seen = &mut self.seen_marker[marker.slot()];
            if *seen {
                return false;
            }
            *seen = true;
        }

        if stripped == "---" {
            self.hr_run += 1;
            if self.hr_run > 1 {
                // A dropped rule must leave the blank run as if it were absent.
                return false;
            }
            self.blank_run = 0;
            true
        } else if stripped.is_empty() {
            // A blank line between two rules does not break the rule run.
            self.blank_run += 1;
            self.blank_run == 1
        } else {
            self.hr_run = 0;
            self.blank_run = 0;
            true
        }
    }
}

/// Remove duplicated metadata headers and collapse redundant spacing.
pub fn normalize(text: &str) -> String {
    let mut state = ScanState::default();
    let kept: Vec<&str> = text.split('\n').filter(|line| state.keep(line)).collect();
    let joined = kept.join("\n");
    RE_EXCESS_NEWLINES.replace_all(&joined, "\n\n").into_owned()
}

/// Result of normalising one file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// The file was rewritten; `removed` bytes were dropped.
    Cleaned { removed: usize },
    /// Normalisation did not change the length; the file was left untouched.
    Unchanged,
}

/// Normalise a Markdown file in place.
///
/// The file is rewritten only when the normalised text differs in length
/// from the original.
pub fn normalize_file(path: &Path) -> io::Result<NormalizeOutcome> {
    let original = std::fs::read_to_string(path)?;
    let cleaned = normalize(&original);

    if cleaned.len() == original.len() {
        debug!("Skipped {}: no changes needed", path.display());
        return Ok(NormalizeOutcome::Unchanged);
    }

    std::fs::write(path, &cleaned)?;
    let removed = original.len().saturating_sub(cleaned.len());
    info!("Cleaned {}: -{} bytes", path.display(), removed);
    Ok(NormalizeOutcome::Cleaned { removed })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSY: &str = "\
# Book Chapter - Chapter 3
# Generated: 2025-01-01
# ==========
# Chapter 3: Closures
# Closures

**Chapter 3:** Closures
**Generated:** 2025-01-01
**Component:** book-chapter

---
---


# Book Chapter - Chapter 3
# Closures Again

**Chapter 3:** Closures
**Generated:** 2025-01-02
**Component:** book-chapter



## Capturing

Body text.
# Chapter 3: Closures
";

    #[test]
    fn idempotent_on_messy_input() {
        let once = normalize(MESSY);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn idempotent_on_clean_input() {
        let clean = "# Title\n\nParagraph one.\n\n## Section\n\nMore.\n";
        assert_eq!(normalize(clean), clean);
        assert_eq!(normalize(&normalize(clean)), normalize(clean));
    }

    #[test]
    fn idempotent_on_edge_inputs() {
        for input in ["", "\n", "\n\n\n", "---\n\n---\n", "   \n   \n", "# A\n# B\n# A"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn repeated_chapter_info_keeps_first_only() {
        let input = "**Chapter 2:** Ownership\ntext\n**Chapter 2:** Borrowing\nmore\n**Chapter 2:** Lifetimes\n";
        let out = normalize(input);
        assert_eq!(out.matches("**Chapter 2:**").count(), 1);
        assert!(out.contains("**Chapter 2:** Ownership"));
        assert!(!out.contains("Borrowing"));
    }

    #[test]
    fn metadata_headings_always_dropped() {
        let out = normalize(MESSY);
        assert!(!out.contains("# Book Chapter"));
        assert!(!out.contains("# Generated:"));
        assert!(!out.contains("# ==="));
    }

    #[test]
    fn only_first_real_title_kept() {
        let out = normalize(MESSY);
        let titles: Vec<&str> = out.lines().filter(|l| l.starts_with("# ")).collect();
        assert_eq!(titles, vec!["# Chapter 3: Closures", "# Closures"]);
        assert!(out.contains("## Capturing"));
    }

    #[test]
    fn chapter_heading_kept_before_title() {
        let out = normalize("# Chapter 3: Closures\n# Closures\n# Chapter 3: Closures");
        assert_eq!(out, "# Chapter 3: Closures\n# Closures");
    }

    #[test]
    fn chapter_heading_dropped_after_title() {
        let out = normalize("# Real Title\n# Chapter 4: Old\ntext");
        assert_eq!(out, "# Real Title\ntext");
    }

    #[test]
    fn generated_marker_case_insensitive() {
        assert_eq!(normalize("# generated: today\nbody"), "body");
    }

    #[test]
    fn blank_runs_collapse_to_one() {
        for n in 2..6 {
            let input = format!("a\n{}b", "\n".repeat(n));
            assert_eq!(normalize(&input), "a\n\nb", "n = {n}");
        }
    }

    #[test]
    fn whitespace_only_lines_count_as_blank() {
        assert_eq!(normalize("a\n  \n\t\nb"), "a\n  \nb");
    }

    #[test]
    fn hr_runs_collapse_to_one() {
        for n in 2..5 {
            let input = format!("a\n{}b", "---\n".repeat(n));
            assert_eq!(normalize(&input), "a\n---\nb", "n = {n}");
        }
    }

    #[test]
    fn subheadings_untouched() {
        let input = "# T\n## One\n## One\n### Two";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn normalize_file_skips_unchanged() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("quiz.md");
        std::fs::write(&path, "# Quiz\n\nQ1\n").unwrap();
        assert_eq!(normalize_file(&path).unwrap(), NormalizeOutcome::Unchanged);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Quiz\n\nQ1\n");
    }

    #[test]
    fn normalize_file_rewrites_changed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("qa.md");
        std::fs::write(&path, "# QA\n\n\n\nQ1\n").unwrap();
        assert_eq!(
            normalize_file(&path).unwrap(),
            NormalizeOutcome::Cleaned { removed: 2 }
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# QA\n\nQ1\n");
    }

    #[test]
    fn normalize_file_missing_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(normalize_file(&dir.path().join("nope.md")).is_err());
    }
}
