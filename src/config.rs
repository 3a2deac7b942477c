//! Configuration for a course build.
//!
//! Everything the pipeline needs to know about the course tree (where the
//! chapters live, what the course is called, which converter to drive) is
//! carried by [`PipelineConfig`] and passed into each component. Nothing is
//! process-global, so two course trees can be built in the same process.

use crate::error::PipelineError;
use crate::progress::ProgressCallback;
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};

/// Course title used when none is configured.
pub const DEFAULT_COURSE_TITLE: &str = "Full-Stack Web Development";

/// Configuration for building chapter PDFs and the course book.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use course_pdf::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .output_root("output")
///     .course_title("Systems Programming")
///     .render_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.pdf_root(), std::path::Path::new("output/pdf"));
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Directory holding the `chapter-NN` directories. Default: `output`.
    pub output_root: PathBuf,

    /// Where PDFs are written. Default: `<output_root>/pdf`.
    pub pdf_root: Option<PathBuf>,

    /// Title printed on every cover. Default: [`DEFAULT_COURSE_TITLE`].
    pub course_title: String,

    /// Converter program invoked for each render-ready document. Default: `pandoc`.
    pub converter: String,

    /// Engine requested on the first (full) converter invocation. Default: `xelatex`.
    pub pdf_engine: String,

    /// Syntax-highlighting style passed to the converter. Default: `tango`.
    pub highlight_style: String,

    /// Ceiling for a single converter invocation in seconds. Default: 120.
    pub render_timeout_secs: u64,

    /// Date printed on covers and encoded in the course file name. Default: today.
    pub generated_on: NaiveDate,

    /// Delete an existing course book of the same date before writing.
    /// When false, or when deletion fails, a `_HHMMSS` suffix is used instead.
    /// Default: true.
    pub replace_existing_course: bool,

    /// Optional event sink for progress reporting.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            pdf_root: None,
            course_title: DEFAULT_COURSE_TITLE.to_string(),
            converter: "pandoc".to_string(),
            pdf_engine: "xelatex".to_string(),
            highlight_style: "tango".to_string(),
            render_timeout_secs: 120,
            generated_on: chrono::Local::now().date_naive(),
            replace_existing_course: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("output_root", &self.output_root)
            .field("pdf_root", &self.pdf_root)
            .field("course_title", &self.course_title)
            .field("converter", &self.converter)
            .field("pdf_engine", &self.pdf_engine)
            .field("highlight_style", &self.highlight_style)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("generated_on", &self.generated_on)
            .field("replace_existing_course", &self.replace_existing_course)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgress>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory receiving per-chapter folders and the course book.
    pub fn pdf_root(&self) -> PathBuf {
        self.pdf_root
            .clone()
            .unwrap_or_else(|| self.output_root.join("pdf"))
    }

    /// Cover date in long form, e.g. "October 16, 2026".
    pub fn generated_label(&self) -> String {
        self.generated_on.format("%B %d, %Y").to_string()
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn output_root(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.output_root = dir.as_ref().to_path_buf();
        self
    }

    pub fn pdf_root(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.pdf_root = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn course_title(mut self, title: impl Into<String>) -> Self {
        self.config.course_title = title.into();
        self
    }

    pub fn converter(mut self, program: impl Into<String>) -> Self {
        self.config.converter = program.into();
        self
    }

    pub fn pdf_engine(mut self, engine: impl Into<String>) -> Self {
        self.config.pdf_engine = engine.into();
        self
    }

    pub fn highlight_style(mut self, style: impl Into<String>) -> Self {
        self.config.highlight_style = style.into();
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn generated_on(mut self, date: NaiveDate) -> Self {
        self.config.generated_on = date;
        self
    }

    pub fn replace_existing_course(mut self, v: bool) -> Self {
        self.config.replace_existing_course = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.course_title.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Course title must not be empty".into(),
            ));
        }
        if c.converter.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Converter program must not be empty".into(),
            ));
        }
        if c.render_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "Render timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
