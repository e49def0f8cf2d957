pub mod csv;
pub mod html;
pub mod json;
pub mod text;

use std::io::{IsTerminal, Write};
use std::path::Path;

use atomic_write_file::AtomicWriteFile;
use clap::ValueEnum;
use serde::Deserialize;

use crate::analyze::Report;
use crate::error::OutputError;

pub use self::csv::format_csv;
pub use self::html::{format_html, DEFAULT_TITLE};
pub use self::json::{format_json, JsonPullRequest, JsonReport};
pub use self::text::format_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
    Html,
}

impl OutputFormat {
    /// Conventional file extension for reports in this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Html => "html",
        }
    }
}

/// The file name at `path` carries an extension other than the one
/// conventional for `format`. Paths without an extension never mismatch.
pub fn extension_mismatch(path: &Path, format: OutputFormat) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| !ext.eq_ignore_ascii_case(format.extension()))
}

/// Presentation knobs that are not part of the report itself.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    pub use_colors: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            use_colors: false,
        }
    }
}

pub fn render(
    report: &Report,
    format: OutputFormat,
    options: &RenderOptions,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Text => Ok(format_text(report, options.use_colors)),
        OutputFormat::Json => format_json(report),
        OutputFormat::Csv => Ok(format_csv(report)),
        OutputFormat::Html => format_html(report, &options.title),
    }
}

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Write a rendered report to `path`, or to stdout when `path` is `None`.
///
/// Files are replaced atomically: the old content stays in place until
/// the new content is fully written.
pub fn write_report(path: Option<&Path>, content: &str) -> Result<(), OutputError> {
    let Some(path) = path else {
        return write_stdout(content).map_err(OutputError::Stdout);
    };

    let io_err = |source: std::io::Error| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = AtomicWriteFile::open(path).map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)?;
    file.commit().map_err(io_err)?;
    Ok(())
}

fn write_stdout(content: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    if !content.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_report;

    #[test]
    fn test_write_report_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_report(Some(&path), "{}\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn test_write_report_overwrites_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "old content that is longer than the new one").unwrap();

        write_report(Some(&path), "new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_write_report_names_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.csv");

        let err = write_report(Some(&path), "x").unwrap_err();
        assert!(matches!(err, OutputError::Io { path: ref p, .. } if *p == path));
        assert!(err.to_string().contains("report.csv"));
    }

    #[test]
    fn test_render_dispatches_on_format() {
        let report = sample_report();
        let options = RenderOptions::default();

        let text = render(&report, OutputFormat::Text, &options).unwrap();
        assert!(text.contains("PR #10"));

        let json = render(&report, OutputFormat::Json, &options).unwrap();
        assert!(json.trim_start().starts_with('{'));

        let csv = render(&report, OutputFormat::Csv, &options).unwrap();
        assert!(csv.starts_with("Repository,PR Number"));

        let html = render(&report, OutputFormat::Html, &options).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_format_names() {
        assert_eq!(
            OutputFormat::from_str("csv", true).unwrap(),
            OutputFormat::Csv
        );
        assert_eq!(OutputFormat::Html.extension(), "html");
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[test]
    fn test_extension_mismatch() {
        assert!(!extension_mismatch(Path::new("out/report.json"), OutputFormat::Json));
        assert!(!extension_mismatch(Path::new("REPORT.HTML"), OutputFormat::Html));
        assert!(!extension_mismatch(Path::new("report"), OutputFormat::Csv));
        assert!(extension_mismatch(Path::new("report.json"), OutputFormat::Csv));
        assert!(extension_mismatch(Path::new("report.md"), OutputFormat::Text));
    }
}
