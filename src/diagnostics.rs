//! Normalized diagnostics and the RELAX NG line-output parser.
//!
//! `jing` reports schema violations as one diagnostic per line on stdout,
//! interleaved with status output. [`LineDiagnosticParser`] extracts the
//! diagnostic lines into structured records and leaves everything else
//! behind; the exit code of the jing run signals pass/fail independently
//! of how many lines could be parsed.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Severity of a normalized issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
}

impl Severity {
    /// Classify a jing severity token. jing emits `error` for schema
    /// violations and `warning` for everything else it reports.
    pub fn from_jing_token(token: &str) -> Self {
        if token == "error" {
            Severity::Error
        } else {
            Severity::Warning
        }
    }

    /// Classify a Schematron role attribute. An absent role means the rule
    /// author gave no severity, which counts as an error; roles other than
    /// `warning` and `information` collapse to error as well.
    pub fn from_schematron_role(role: &str) -> Self {
        match role {
            "warning" => Severity::Warning,
            "information" => Severity::Information,
            _ => Severity::Error,
        }
    }

    /// Glyph used in rendered report tables.
    pub fn glyph(&self) -> &'static str {
        match self {
            Severity::Error => "\u{274c}",
            Severity::Warning => "\u{26a0}\u{fe0f}",
            Severity::Information => "\u{2139}\u{fe0f}",
        }
    }
}

/// One normalized diagnostic, regardless of which validator produced it.
///
/// `line` and `column` are 1-based and 0 when the position is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub file: PathBuf,
    pub message: String,
    pub severity: Severity,
    pub line: u32,
    pub column: u32,
}

/// One line of jing output, as emitted.
///
/// The path is kept as printed (possibly absolute) until the parser
/// rewrites it; the severity token is kept verbatim and classified on
/// demand.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLineDiagnostic {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub severity_token: String,
    pub message: String,
}

impl RawLineDiagnostic {
    pub fn severity(&self) -> Severity {
        Severity::from_jing_token(&self.severity_token)
    }
}

static DIAGNOSTIC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^:]+):([0-9]+):([0-9]+): ([^:]+): (.+)$")
        .expect("diagnostic line pattern is valid")
});

/// Parser for the line-oriented text stream captured from a jing run.
#[derive(Debug, Clone)]
pub struct LineDiagnosticParser {
    working_dir: PathBuf,
}

impl LineDiagnosticParser {
    /// Create a parser that rewrites diagnostic paths relative to `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Parse the full captured output of one run (covering possibly many
    /// files) into an ordered sequence of diagnostics. Lines that do not
    /// match the diagnostic shape are discarded.
    pub fn parse(&self, output: &str) -> Vec<RawLineDiagnostic> {
        output
            .lines()
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    fn parse_line(&self, line: &str) -> Option<RawLineDiagnostic> {
        let captures = DIAGNOSTIC_LINE.captures(line)?;
        // The pattern guarantees the digit groups, but a line count beyond
        // u32 is garbage input and is dropped like any other mismatch.
        let line_number: u32 = captures[2].parse().ok()?;
        let column_number: u32 = captures[3].parse().ok()?;
        Some(RawLineDiagnostic {
            file: relative_to(Path::new(&captures[1]), &self.working_dir),
            line: line_number,
            column: column_number,
            severity_token: captures[4].to_string(),
            message: captures[5].to_string(),
        })
    }
}

/// Rewrite `path` relative to `base` so downstream links are stable no
/// matter which absolute path the validator printed. Paths outside `base`
/// (or relative already) are returned unchanged.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}
