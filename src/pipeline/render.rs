//! Renderer adapter: turn a render-ready Markdown file into a PDF by
//! driving an external converter.
//!
//! ## Two attempts, one ceiling each
//!
//! The first invocation asks for the full treatment (dedicated PDF engine,
//! table of contents, coloured links). Converters installed without that
//! engine reject it, so a non-zero exit triggers one reduced invocation with
//! only margins and highlighting. Each attempt runs under the configured
//! timeout; a timeout fails the document at once and is never retried.
//!
//! The child is spawned with `kill_on_drop`, so an abandoned attempt does
//! not leave a converter running behind the pipeline.

use crate::config::PipelineConfig;
use crate::error::DocumentError;
use crate::role::DocumentRole;
use std::ffi::OsString;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Bytes of converter stderr kept in warnings and error details.
const STDERR_EXCERPT: usize = 200;

/// Converts one render-ready document into a PDF at `output`.
///
/// The pipeline only depends on this contract, so tests can substitute a
/// renderer that writes fixture PDFs instead of spawning a process.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        source: &Path,
        output: &Path,
        role: DocumentRole,
    ) -> impl Future<Output = Result<(), DocumentError>> + Send;
}

/// Drives `pandoc` (or any converter with the same command line).
#[derive(Debug, Clone)]
pub struct PandocRenderer {
    program: String,
    pdf_engine: String,
    highlight_style: String,
    timeout: Duration,
}

/// Outcome of one converter invocation.
enum Attempt {
    Succeeded,
    Failed(String),
    TimedOut,
}

impl PandocRenderer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            program: config.converter.clone(),
            pdf_engine: config.pdf_engine.clone(),
            highlight_style: config.highlight_style.clone(),
            timeout: Duration::from_secs(config.render_timeout_secs),
        }
    }

    /// Arguments for the full-fidelity invocation.
    pub fn full_args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![source.into(), "-o".into(), output.into()];
        args.extend(
            [
                format!("--pdf-engine={}", self.pdf_engine),
                "-V".into(),
                "geometry:margin=1in".into(),
                "-V".into(),
                "fontsize=11pt".into(),
                format!("--highlight-style={}", self.highlight_style),
                "--toc".into(),
                "--toc-depth=2".into(),
                "-V".into(),
                "colorlinks=true".into(),
                "-V".into(),
                "linkcolor=blue".into(),
                "-V".into(),
                "urlcolor=blue".into(),
            ]
            .map(OsString::from),
        );
        args
    }

    /// Arguments for the reduced invocation used after the full one fails.
    pub fn fallback_args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![source.into(), "-o".into(), output.into()];
        args.extend(
            [
                "-V".into(),
                "geometry:margin=1in".into(),
                format!("--highlight-style={}", self.highlight_style),
            ]
            .map(OsString::from),
        );
        args
    }

    async fn attempt(&self, args: &[OsString]) -> Attempt {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Err(_) => Attempt::TimedOut,
            Ok(Err(e)) => Attempt::Failed(format!("cannot run '{}': {}", self.program, e)),
            Ok(Ok(out)) if out.status.success() => Attempt::Succeeded,
            Ok(Ok(out)) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                Attempt::Failed(format!("{}: {}", out.status, excerpt(stderr.trim())))
            }
        }
    }
}

impl Renderer for PandocRenderer {
    async fn render(
        &self,
        source: &Path,
        output: &Path,
        role: DocumentRole,
    ) -> Result<(), DocumentError> {
        let timed_out = || DocumentError::ConverterTimeout {
            role,
            secs: self.timeout.as_secs(),
        };

        debug!("Rendering {} -> {}", source.display(), output.display());
        let first = match self.attempt(&self.full_args(source, output)).await {
            Attempt::Succeeded => return Ok(()),
            Attempt::TimedOut => {
                warn!("Converter timeout for {}", source.display());
                return Err(timed_out());
            }
            Attempt::Failed(detail) => detail,
        };

        debug!("Full render of {} failed ({}); retrying reduced", source.display(), first);
        match self.attempt(&self.fallback_args(source, output)).await {
            Attempt::Succeeded => Ok(()),
            Attempt::TimedOut => {
                warn!("Converter timeout for {}", source.display());
                Err(timed_out())
            }
            Attempt::Failed(detail) => {
                warn!("Converter error for {}: {}", source.display(), detail);
                Err(DocumentError::ConverterFailed { role, detail })
            }
        }
    }
}

/// First [`STDERR_EXCERPT`] bytes of `text`, cut on a char boundary.
fn excerpt(text: &str) -> &str {
    if text.len() <= STDERR_EXCERPT {
        return text;
    }
    let mut end = STDERR_EXCERPT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(program: &str, timeout_secs: u64) -> PandocRenderer {
        let config = PipelineConfig::builder()
            .converter(program)
            .render_timeout_secs(timeout_secs)
            .build()
            .unwrap();
        PandocRenderer::from_config(&config)
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn full_args_request_engine_toc_and_links() {
        let r = renderer("pandoc", 120);
        let args = strings(r.full_args(Path::new("in.md"), Path::new("out.pdf")));
        assert_eq!(&args[..3], ["in.md", "-o", "out.pdf"]);
        for expected in [
            "--pdf-engine=xelatex",
            "geometry:margin=1in",
            "fontsize=11pt",
            "--highlight-style=tango",
            "--toc",
            "--toc-depth=2",
            "colorlinks=true",
            "linkcolor=blue",
            "urlcolor=blue",
        ] {
            assert!(args.iter().any(|a| a == expected), "missing {expected}");
        }
    }

    #[test]
    fn fallback_args_are_reduced() {
        let r = renderer("pandoc", 120);
        let args = strings(r.fallback_args(Path::new("in.md"), Path::new("out.pdf")));
        assert_eq!(
            args,
            ["in.md", "-o", "out.pdf", "-V", "geometry:margin=1in", "--highlight-style=tango"]
        );
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let long = "é".repeat(150);
        let cut = excerpt(&long);
        assert!(cut.len() <= STDERR_EXCERPT);
        assert_eq!(cut.chars().count(), 100);
        assert_eq!(excerpt("short"), "short");
    }

    #[tokio::test]
    async fn missing_converter_fails_document() {
        let r = renderer("/nonexistent/converter-binary", 5);
        let dir = tempfile::TempDir::new().unwrap();
        let err = r
            .render(&dir.path().join("a.md"), &dir.path().join("a.pdf"), DocumentRole::Quiz)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::ConverterFailed { role: DocumentRole::Quiz, .. }));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// Write an executable shell script standing in for the converter.
        fn script(dir: &TempDir, body: &str) -> String {
            let path = dir.path().join("fake-converter");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[tokio::test]
        async fn succeeds_on_first_attempt() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, r#"echo "$@" >> "$(dirname "$0")/calls"; touch "$3""#);
            let out = dir.path().join("doc.pdf");
            renderer(&program, 10)
                .render(Path::new("doc.md"), &out, DocumentRole::BookChapter)
                .await
                .unwrap();
            assert!(out.exists());
            let calls = std::fs::read_to_string(dir.path().join("calls")).unwrap();
            assert_eq!(calls.lines().count(), 1);
            assert!(calls.contains("--toc"));
        }

        #[tokio::test]
        async fn falls_back_when_full_render_fails() {
            let dir = TempDir::new().unwrap();
            let program = script(
                &dir,
                r#"echo "$@" >> "$(dirname "$0")/calls"
for a in "$@"; do [ "$a" = "--toc" ] && { echo "xelatex not found" >&2; exit 43; }; done
touch "$3""#,
            );
            let out = dir.path().join("doc.pdf");
            renderer(&program, 10)
                .render(Path::new("doc.md"), &out, DocumentRole::Exercises)
                .await
                .unwrap();
            assert!(out.exists());
            let calls = std::fs::read_to_string(dir.path().join("calls")).unwrap();
            assert_eq!(calls.lines().count(), 2);
            assert!(!calls.lines().nth(1).unwrap().contains("--toc"));
        }

        #[tokio::test]
        async fn both_attempts_failing_reports_stderr() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, r#"echo "broken input" >&2; exit 1"#);
            let err = renderer(&program, 10)
                .render(Path::new("doc.md"), &dir.path().join("doc.pdf"), DocumentRole::Qa)
                .await
                .unwrap_err();
            match err {
                DocumentError::ConverterFailed { role, detail } => {
                    assert_eq!(role, DocumentRole::Qa);
                    assert!(detail.contains("broken input"), "got: {detail}");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn timeout_is_not_retried() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, r#"echo run >> "$(dirname "$0")/calls"; sleep 5"#);
            let err = renderer(&program, 1)
                .render(Path::new("doc.md"), &dir.path().join("doc.pdf"), DocumentRole::Topics)
                .await
                .unwrap_err();
            assert_eq!(
                err,
                DocumentError::ConverterTimeout {
                    role: DocumentRole::Topics,
                    secs: 1
                }
            );
            let calls = std::fs::read_to_string(dir.path().join("calls")).unwrap();
            assert_eq!(calls.lines().count(), 1);
        }
    }
}
