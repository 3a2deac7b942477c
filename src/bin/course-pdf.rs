//! CLI binary for course-pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgGroup, Parser};
use course_pdf::{
    build, merge_only, normalize_tree, ChapterSelection, DocumentRole, NormalizeReport,
    PipelineConfig, PipelineProgress, ProgressCallback, RunReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar advancing per chapter, with a log
/// line per document printed above it.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning chapters…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineProgress for CliProgress {
    fn on_run_start(&self, chapters: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chapters  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&TICKS);

        self.bar.set_length(chapters as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Building");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {chapters} chapter(s)…"))
        ));
    }

    fn on_chapter_start(&self, chapter: u32, _total: usize) {
        self.bar.set_message(format!("chapter {chapter}"));
    }

    fn on_document_complete(&self, chapter: u32, role: DocumentRole, pages: usize) {
        self.bar.println(format!(
            "  {} Chapter {:>2}  {:<16} {}",
            green("✓"),
            chapter,
            role.stem(),
            dim(&format!("{pages:>3} pages")),
        ));
    }

    fn on_document_error(&self, chapter: u32, role: DocumentRole, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} Chapter {:>2}  {:<16} {}",
            red("✗"),
            chapter,
            role.stem(),
            red(&msg),
        ));
    }

    fn on_chapter_complete(&self, chapter: u32, merged: Option<&Path>) {
        if merged.is_none() {
            self.bar.println(format!(
                "  {} Chapter {:>2}  {}",
                cyan("⚠"),
                chapter,
                dim("no chapter PDF")
            ));
        }
        self.bar.inc(1);
    }

    fn on_course_complete(&self, _path: &Path, _pages: usize) {
        self.bar.set_prefix("Done");
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Build every chapter under ./output and the course book
  course-pdf --all

  # Rebuild chapters 1 and 5 only
  course-pdf --chapter 1 --chapter 5

  # Re-assemble the course book from existing chapter PDFs
  course-pdf --all --merge-only

  # Only clean duplicated headers in the Markdown sources
  course-pdf --all --normalize-only

  # Custom tree and title, JSON report on stdout
  course-pdf --all --output-dir ~/course/output --title "Rust in Practice" --json

LAYOUT:
  <output-dir>/chapter-NN/{book-chapter,exercises,instructor-keys,quiz,qa,topics,powerpoint}.md
  <output-dir>/chapter-NN/paginated-archive/      render-ready copies
  <pdf-dir>/chapter-NN/chapter-NN_complete.pdf    one per chapter
  <pdf-dir>/course-complete_YYYYMMDD.pdf          one per run

ENVIRONMENT VARIABLES:
  COURSE_PDF_OUTPUT_DIR       Directory holding chapter-NN folders
  COURSE_PDF_PDF_DIR          Where PDFs are written (default <output-dir>/pdf)
  COURSE_PDF_TITLE            Course title printed on covers
  COURSE_PDF_CONVERTER        Markdown-to-PDF converter (default pandoc)
  COURSE_PDF_ENGINE           Engine for the full render (default xelatex)
  COURSE_PDF_TIMEOUT          Seconds per converter invocation (default 120)
  RUST_LOG                    Override log filtering

SETUP:
  Install pandoc and a LaTeX distribution providing xelatex. Without
  xelatex each document is retried with pandoc's default engine.
"#;

/// Build numbered chapter PDFs and a course book from chapter Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "course-pdf",
    version,
    about = "Build numbered chapter PDFs and a course book from chapter Markdown",
    long_about = "Convert each chapter's Markdown documents to PDF with an external converter, \
label every page \"<chapter>.<page>\", merge each chapter behind a cover page, and bind all \
chapters into one dated course book.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP,
    group(ArgGroup::new("selection").required(true).args(["all", "chapter"]))
)]
struct Cli {
    /// Process every chapter directory found.
    #[arg(long)]
    all: bool,

    /// Process a specific chapter (repeatable).
    #[arg(short, long, value_name = "N")]
    chapter: Vec<u32>,

    /// Skip regeneration; assemble the course book from existing chapter PDFs.
    #[arg(long, conflicts_with = "normalize_only")]
    merge_only: bool,

    /// Only clean duplicated headers in the chapter Markdown files.
    #[arg(long)]
    normalize_only: bool,

    /// Directory holding the chapter-NN directories.
    #[arg(long, env = "COURSE_PDF_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Where PDFs are written. Default: <output-dir>/pdf.
    #[arg(long, env = "COURSE_PDF_PDF_DIR")]
    pdf_dir: Option<PathBuf>,

    /// Course title printed on every cover.
    #[arg(long, env = "COURSE_PDF_TITLE")]
    title: Option<String>,

    /// Markdown-to-PDF converter program.
    #[arg(long, env = "COURSE_PDF_CONVERTER", default_value = "pandoc")]
    converter: String,

    /// PDF engine requested on the first converter attempt.
    #[arg(long, env = "COURSE_PDF_ENGINE", default_value = "xelatex")]
    pdf_engine: String,

    /// Syntax-highlighting style passed to the converter.
    #[arg(long, env = "COURSE_PDF_HIGHLIGHT_STYLE", default_value = "tango")]
    highlight_style: String,

    /// Seconds allowed per converter invocation.
    #[arg(long, env = "COURSE_PDF_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Date printed on covers and in the course file name (YYYY-MM-DD). Default: today.
    #[arg(long, env = "COURSE_PDF_DATE")]
    date: Option<NaiveDate>,

    /// Never delete an existing course book; write a time-suffixed one instead.
    #[arg(long, env = "COURSE_PDF_KEEP_EXISTING")]
    keep_existing: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "COURSE_PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "COURSE_PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "COURSE_PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "COURSE_PDF_QUIET")]
    quiet: bool,
}

impl Cli {
    fn selection(&self) -> ChapterSelection {
        if self.all {
            ChapterSelection::All
        } else {
            ChapterSelection::numbers(self.chapter.iter().copied())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.normalize_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress = show_progress.then(CliProgress::new);
    let config = build_config(&cli, progress.clone().map(|p| p as ProgressCallback))?;
    let selection = cli.selection();

    // ── Cleanup-only mode ────────────────────────────────────────────────
    if cli.normalize_only {
        let report = normalize_tree(&config, &selection)
            .await
            .context("Header cleanup failed")?;
        print_normalize(&cli, &report)?;
        return Ok(());
    }

    // ── Build or merge ───────────────────────────────────────────────────
    let result = if cli.merge_only {
        merge_only(&config, &selection).await
    } else {
        build(&config, &selection).await
    };
    if let Some(ref p) = progress {
        p.finish();
    }
    let report = result.context("PDF pipeline failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, &config.pdf_root());
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .output_root(&cli.output_dir)
        .converter(&cli.converter)
        .pdf_engine(&cli.pdf_engine)
        .highlight_style(&cli.highlight_style)
        .render_timeout_secs(cli.timeout)
        .replace_existing_course(!cli.keep_existing);

    if let Some(ref dir) = cli.pdf_dir {
        builder = builder.pdf_root(dir);
    }
    if let Some(ref title) = cli.title {
        builder = builder.course_title(title);
    }
    if let Some(date) = cli.date {
        builder = builder.generated_on(date);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_normalize(cli: &Cli, report: &NormalizeReport) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{} Complete: {}/{} files cleaned{}",
            if report.failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&report.cleaned.to_string()),
            report.total,
            if report.failed > 0 {
                red(&format!("  ({} unreadable)", report.failed))
            } else {
                String::new()
            },
        );
    }
    Ok(())
}

fn print_summary(report: &RunReport, pdf_root: &Path) {
    let rendered = report.rendered();
    let failed = report.failed();

    for (chapter, error) in report.errors() {
        eprintln!("  {} Chapter {:>2}  {}", red("✗"), chapter, error);
    }
    for chapter in &report.chapters {
        if let Some(ref error) = chapter.error {
            eprintln!("  {} Chapter {:>2}  {}", red("✗"), chapter.number, red(error));
        }
    }

    if rendered + failed > 0 {
        eprintln!(
            "{} {} documents rendered{}  {}",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&rendered.to_string()),
            if failed > 0 {
                format!("  ({} failed)", red(&failed.to_string()))
            } else {
                String::new()
            },
            dim(&format!("{}ms", report.duration_ms)),
        );
    }

    match report.course {
        Some(ref course) => eprintln!(
            "{} Created: {}  {}",
            green("✔"),
            bold(&course.path.display().to_string()),
            dim(&format!(
                "{} chapters, {} pages, {:.1} MB",
                course.chapters,
                course.pages,
                course.size_mb()
            )),
        ),
        None => eprintln!("{} No chapter PDFs available; course book not created", red("✘")),
    }
    eprintln!("   PDFs available at: {}", dim(&pdf_root.display().to_string()));
}
