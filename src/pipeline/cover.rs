//! Cover pages for chapters and for the course book.
//!
//! Both covers are single US Letter pages drawn with the standard Helvetica
//! faces; see [`crate::pipeline::pdf`] for the coordinate system.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::pdf::{Canvas, StandardFont, INCH, LETTER};
use lopdf::Document;

/// Titles longer than this many characters are wrapped.
const WRAP_THRESHOLD: usize = 40;

/// Approximate characters per wrapped title line.
const WRAP_WIDTH: usize = 35;

const COURSE_SUBTITLE: &str = "Complete Course Materials";

/// Greedy word-wrap of a chapter title for the cover.
///
/// Titles of at most 40 characters come back as a single line. Longer
/// titles are split at word boundaries into lines of at most 35 characters;
/// a single word longer than that stays on a line of its own.
pub fn wrap_title(title: &str) -> Vec<String> {
    if title.chars().count() <= WRAP_THRESHOLD {
        return vec![title.to_string()];
    }

    let mut lines = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in title.split_whitespace() {
        current.push(word);
        if current.len() > 1 && joined_len(&current) > WRAP_WIDTH {
            current.pop();
            lines.push(current.join(" "));
            current = vec![word];
        }
    }
    if !current.is_empty() {
        lines.push(current.join(" "));
    }
    lines
}

fn joined_len(words: &[&str]) -> usize {
    words.iter().map(|w| w.chars().count()).sum::<usize>() + words.len().saturating_sub(1)
}

/// Build the cover page for one chapter.
///
/// Layout: a three-inch colour band at the top carrying the course title and
/// "Chapter N", the chapter title large in the middle of the page, and the
/// generation date small and grey one inch above the bottom edge.
pub fn make_chapter_cover(
    config: &PipelineConfig,
    chapter: u32,
    title: &str,
) -> Result<Document, PipelineError> {
    let (width, height) = LETTER;
    let centre = width / 2.0;
    let mut c = Canvas::new(width, height);

    c.set_fill_rgb(0.2, 0.4, 0.6);
    c.fill_rect(0.0, height - 3.0 * INCH, width, 3.0 * INCH);

    c.set_fill_rgb(1.0, 1.0, 1.0);
    c.draw_centred_string(
        StandardFont::HelveticaBold,
        24.0,
        centre,
        height - 1.5 * INCH,
        &config.course_title,
    );
    c.draw_centred_string(
        StandardFont::Helvetica,
        14.0,
        centre,
        height - 2.0 * INCH,
        &format!("Chapter {chapter}"),
    );

    c.set_fill_rgb(0.0, 0.0, 0.0);
    let lines = wrap_title(title);
    if lines.len() > 1 {
        let mut y = height / 2.0 + lines.len() as f32 * 20.0;
        for line in &lines {
            c.draw_centred_string(StandardFont::HelveticaBold, 28.0, centre, y, line);
            y -= 40.0;
        }
    } else {
        c.draw_centred_string(StandardFont::HelveticaBold, 28.0, centre, height / 2.0, title);
    }

    c.set_fill_rgb(0.5, 0.5, 0.5);
    c.draw_centred_string(
        StandardFont::Helvetica,
        10.0,
        centre,
        INCH,
        &format!("Generated: {}", config.generated_label()),
    );

    c.into_document()
        .map_err(|e| PipelineError::Internal(format!("chapter cover: {e}")))
}

/// Build the course-level cover.
pub fn make_course_cover(
    config: &PipelineConfig,
    chapter_count: usize,
) -> Result<Document, PipelineError> {
    let (width, height) = LETTER;
    let centre = width / 2.0;
    let mut c = Canvas::new(width, height);

    c.set_fill_rgb(0.15, 0.3, 0.5);
    c.fill_rect(0.0, 0.0, width, height);

    c.set_fill_rgb(1.0, 1.0, 1.0);
    c.draw_centred_string(
        StandardFont::HelveticaBold,
        36.0,
        centre,
        height - 3.0 * INCH,
        &config.course_title,
    );
    c.draw_centred_string(
        StandardFont::Helvetica,
        18.0,
        centre,
        height - 3.8 * INCH,
        COURSE_SUBTITLE,
    );
    c.draw_centred_string(
        StandardFont::Helvetica,
        14.0,
        centre,
        height / 2.0,
        &format!("{chapter_count} Chapters"),
    );
    c.draw_centred_string(
        StandardFont::Helvetica,
        12.0,
        centre,
        1.5 * INCH,
        &format!("Generated: {}", config.generated_label()),
    );

    c.into_document()
        .map_err(|e| PipelineError::Internal(format!("course cover: {e}")))
}
