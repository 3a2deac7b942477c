//! End-to-end runs over a temporary course tree.
//!
//! The external converter is replaced by a renderer that synthesises a
//! PDF with a fixed page count per chapter or document, so these tests need
//! neither pandoc nor LaTeX.

use chrono::NaiveDate;
use course_pdf::pipeline::merge::merge_documents;
use course_pdf::pipeline::pdf::{self, Canvas, StandardFont, LETTER};
use course_pdf::{
    build_with, merge_only, normalize_tree, ChapterSelection, DocumentError, DocumentRole,
    PipelineConfig, PipelineError, Renderer,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

#[derive(Default)]
struct SyntheticRenderer {
    /// Page count by chapter number; wins over `pages`.
    chapter_pages: HashMap<u32, usize>,
    pages: HashMap<DocumentRole, usize>,
    failing: Vec<DocumentRole>,
    calls: Mutex<Vec<PathBuf>>,
}

impl SyntheticRenderer {
    fn with_pages(pages: impl IntoIterator<Item = (DocumentRole, usize)>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            ..Default::default()
        }
    }

    fn with_chapter_pages(pages: impl IntoIterator<Item = (u32, usize)>) -> Self {
        Self {
            chapter_pages: pages.into_iter().collect(),
            ..Default::default()
        }
    }

    fn page_count(&self, source: &Path, role: DocumentRole) -> usize {
        let chapter = source
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("chapter-"))
            .and_then(|n| n.parse::<u32>().ok());
        chapter
            .and_then(|n| self.chapter_pages.get(&n))
            .or_else(|| self.pages.get(&role))
            .copied()
            .unwrap_or(1)
    }

    fn call_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|p| {
                let chapter = p.parent().unwrap().file_name().unwrap().to_string_lossy();
                let file = p.file_name().unwrap().to_string_lossy();
                format!("{chapter}/{file}")
            })
            .collect()
    }
}

impl Renderer for SyntheticRenderer {
    async fn render(
        &self,
        source: &Path,
        output: &Path,
        role: DocumentRole,
    ) -> Result<(), DocumentError> {
        self.calls.lock().unwrap().push(source.to_path_buf());
        if self.failing.contains(&role) {
            return Err(DocumentError::ConverterFailed {
                role,
                detail: "exit status: 1".into(),
            });
        }
        let count = self.page_count(source, role);
        let pages = (1..=count)
            .map(|n| {
                let mut canvas = Canvas::new(LETTER.0, LETTER.1);
                canvas.draw_centred_string(
                    StandardFont::Helvetica,
                    12.0,
                    LETTER.0 / 2.0,
                    600.0,
                    &format!("{} {n}", role.stem()),
                );
                canvas.into_document().unwrap()
            })
            .collect();
        let mut doc = merge_documents(pages).unwrap();
        pdf::save(&mut doc, output).unwrap();
        Ok(())
    }
}

struct Course {
    tmp: TempDir,
    config: PipelineConfig,
}

impl Course {
    fn new(replace_existing: bool) -> Self {
        let tmp = TempDir::new().unwrap();
        let config = PipelineConfig::builder()
            .output_root(tmp.path())
            .course_title("Rust in Practice")
            .generated_on(NaiveDate::from_ymd_opt(2026, 5, 4).unwrap())
            .replace_existing_course(replace_existing)
            .build()
            .unwrap();
        Self { tmp, config }
    }

    fn write(&self, chapter: u32, role: DocumentRole, text: &str) {
        let dir = self.tmp.path().join(format!("chapter-{chapter:02}"));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(role.markdown_name()), text).unwrap();
    }

    fn pdf_root(&self) -> PathBuf {
        self.config.pdf_root()
    }
}

/// Last string drawn on every page: the page label, or the cover's date line.
fn last_strings(path: &Path) -> Vec<String> {
    let doc = pdf::load(path).unwrap();
    (1..=doc.get_pages().len() as u32)
        .map(|n| pdf::page_strings(&doc, n).pop().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn all_chapters_produce_labelled_chapters_and_course_book() {
    let course = Course::new(true);
    course.write(1, DocumentRole::BookChapter, "# Ownership\n\nText\n");
    course.write(2, DocumentRole::BookChapter, "# Lifetimes\n\nText\n");
    let renderer = SyntheticRenderer::with_chapter_pages([(1, 2), (2, 3)]);

    let report = build_with(&course.config, &ChapterSelection::All, &renderer)
        .await
        .unwrap();

    let ch1 = report.chapters[0].pdf.clone().unwrap();
    let ch2 = report.chapters[1].pdf.clone().unwrap();
    assert!(ch1.ends_with("chapter-01/chapter-01_complete.pdf"));
    assert_eq!(report.chapters[0].total_pages, 3);
    assert_eq!(report.chapters[1].total_pages, 4);
    assert_eq!(last_strings(&ch1)[1..], ["1.1", "1.2"]);
    assert_eq!(last_strings(&ch2)[1..], ["2.1", "2.2", "2.3"]);

    let doc = pdf::load(&ch1).unwrap();
    let cover = pdf::page_strings(&doc, 1);
    assert_eq!(cover[..3], ["Rust in Practice", "Chapter 1", "Ownership"]);

    let book = report.course.unwrap();
    assert_eq!(book.pages, 8);
    assert_eq!(book.chapters, 2);
    assert_eq!(
        book.path,
        course.pdf_root().join("course-complete_20260504.pdf")
    );
    let doc = pdf::load(&book.path).unwrap();
    assert_eq!(pdf::page_strings(&doc, 1)[2], "2 Chapters");
    assert_eq!(pdf::page_strings(&doc, 2)[2], "Ownership");
    assert_eq!(pdf::page_strings(&doc, 5)[2], "Lifetimes");
    let labels = last_strings(&book.path);
    assert_eq!(labels[2..4], ["1.1", "1.2"]);
    assert_eq!(labels[5..], ["2.1", "2.2", "2.3"]);
}

#[tokio::test]
async fn merge_only_rebinds_existing_chapter_pdfs() {
    let course = Course::new(true);
    course.write(1, DocumentRole::BookChapter, "# Ownership\n");
    course.write(2, DocumentRole::BookChapter, "# Lifetimes\n");
    let renderer = SyntheticRenderer::with_chapter_pages([(1, 2), (2, 3)]);
    build_with(&course.config, &ChapterSelection::All, &renderer)
        .await
        .unwrap();

    let report = merge_only(&course.config, &ChapterSelection::All)
        .await
        .unwrap();

    let titles: Vec<&str> = report.chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Ownership", "Lifetimes"]);
    assert_eq!(report.course.unwrap().pages, 8);
    assert_eq!(renderer.call_names().len(), 2);
}

#[tokio::test]
async fn unwritable_chapter_pdf_does_not_stop_the_run() {
    let course = Course::new(true);
    course.write(1, DocumentRole::BookChapter, "# Ownership\n");
    course.write(2, DocumentRole::BookChapter, "# Lifetimes\n");
    // a directory occupying chapter 1's output name makes its write fail
    let occupied = course.pdf_root().join("chapter-01/chapter-01_complete.pdf");
    std::fs::create_dir_all(&occupied).unwrap();
    let renderer = SyntheticRenderer::with_chapter_pages([(1, 2), (2, 3)]);

    let report = build_with(&course.config, &ChapterSelection::All, &renderer)
        .await
        .unwrap();

    assert!(report.chapters[0].pdf.is_none());
    assert!(report.chapters[0].error.is_some());
    assert!(report.chapters[1].pdf.is_some());
    let book = report.course.unwrap();
    assert_eq!(book.chapters, 1);
    assert_eq!(book.pages, 1 + 4);
    let doc = pdf::load(&book.path).unwrap();
    assert_eq!(pdf::page_strings(&doc, 2)[2], "Lifetimes");
}

#[tokio::test]
async fn documents_render_in_role_order_and_chapters_ascending() {
    let course = Course::new(true);
    for chapter in [10, 2] {
        course.write(chapter, DocumentRole::Powerpoint, "# Slides\n");
        course.write(chapter, DocumentRole::Quiz, "# Quiz\n");
        course.write(chapter, DocumentRole::BookChapter, "# Body\n");
    }
    let renderer = SyntheticRenderer::default();

    let report = build_with(&course.config, &ChapterSelection::All, &renderer)
        .await
        .unwrap();

    assert_eq!(
        renderer.call_names(),
        vec![
            "chapter-02/book-chapter_paginated.md",
            "chapter-02/quiz_paginated.md",
            "chapter-02/powerpoint_paginated.md",
            "chapter-10/book-chapter_paginated.md",
            "chapter-10/quiz_paginated.md",
            "chapter-10/powerpoint_paginated.md",
        ]
    );
    let numbers: Vec<u32> = report.chapters.iter().map(|c| c.number).collect();
    assert_eq!(numbers, vec![2, 10]);
    assert_eq!(report.course.unwrap().pages, 1 + 4 + 4);
}

#[tokio::test]
async fn failed_document_is_dropped_and_run_continues() {
    let course = Course::new(true);
    for role in DocumentRole::ALL {
        course.write(3, role, &format!("# {}\n", role.stem()));
    }
    let renderer = SyntheticRenderer {
        failing: vec![DocumentRole::Topics],
        ..SyntheticRenderer::with_pages([(DocumentRole::BookChapter, 2)])
    };

    let report = build_with(&course.config, &ChapterSelection::All, &renderer)
        .await
        .unwrap();

    assert_eq!(report.rendered(), 6);
    assert_eq!(report.failed(), 1);
    let errors: Vec<(u32, DocumentRole)> = report.errors().map(|(n, e)| (n, e.role())).collect();
    assert_eq!(errors, vec![(3, DocumentRole::Topics)]);

    let chapter = &report.chapters[0];
    assert_eq!(chapter.total_pages, 8);
    // numbering restarts with every document
    assert_eq!(
        last_strings(chapter.pdf.as_ref().unwrap())[1..],
        ["3.1", "3.2", "3.1", "3.1", "3.1", "3.1", "3.1"]
    );

    let archive = course.tmp.path().join("chapter-03/paginated-archive");
    assert!(archive.join("topics_paginated.md").exists());
    assert!(!course.tmp.path().join("chapter-03/topics_paginated.md").exists());
}

#[tokio::test]
async fn course_book_kept_when_replacement_disallowed() {
    let course = Course::new(false);
    course.write(1, DocumentRole::Quiz, "# Quiz\n");
    let renderer = SyntheticRenderer::default();

    let first = build_with(&course.config, &ChapterSelection::All, &renderer)
        .await
        .unwrap()
        .course
        .unwrap();
    let second = build_with(&course.config, &ChapterSelection::All, &renderer)
        .await
        .unwrap()
        .course
        .unwrap();

    assert_eq!(first.path, course.pdf_root().join("course-complete_20260504.pdf"));
    assert_ne!(first.path, second.path);
    assert!(first.path.exists());
    assert!(second.path.exists());
}

#[tokio::test]
async fn unknown_chapter_selection_is_fatal() {
    let course = Course::new(true);
    course.write(1, DocumentRole::Quiz, "# Quiz\n");
    let renderer = SyntheticRenderer::default();

    let err = build_with(&course.config, &ChapterSelection::numbers([7, 8]), &renderer)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NoChapters { .. }));
    assert!(renderer.call_names().is_empty());
}

#[tokio::test]
async fn normalize_only_cleans_sources_without_rendering() {
    let course = Course::new(true);
    course.write(
        1,
        DocumentRole::BookChapter,
        "# Book Chapter - Chapter 1\n# Ownership\n\n\n\n\nBody\n",
    );

    let report = normalize_tree(&course.config, &ChapterSelection::All)
        .await
        .unwrap();

    assert_eq!(report.cleaned, 1);
    assert!(!course.pdf_root().exists());
}
