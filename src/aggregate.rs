//! Merging the two diagnostic streams into one issue list.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{relative_to, Issue, RawLineDiagnostic, Severity};
use crate::svrl::SchematronAssertion;

/// Summary counters over the combined issue list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    /// Files handed to the validators, with or without findings.
    pub total_files: usize,
    /// Distinct files that produced at least one issue.
    pub files_with_issues: usize,
    pub total_issues: usize,
    /// Distinct messages, by exact string equality.
    pub unique_issues: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Final result of one validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
    pub stats: ReportStats,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.stats.errors > 0
    }
}

/// Collects diagnostics from both validators in discovery order and
/// produces the final report.
#[derive(Debug)]
pub struct IssueAggregator {
    issues: Vec<Issue>,
    total_files: usize,
    working_dir: Option<PathBuf>,
}

impl IssueAggregator {
    pub fn new(total_files: usize) -> Self {
        Self {
            issues: Vec::new(),
            total_files,
            working_dir: None,
        }
    }

    /// Rewrite assertion document paths relative to `working_dir`, the
    /// same normalization the line parser applies to jing paths.
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Map jing diagnostics 1:1 onto issues, carrying severity through.
    pub fn add_line_diagnostics<'a>(
        &mut self,
        diagnostics: impl IntoIterator<Item = &'a RawLineDiagnostic>,
    ) {
        for diagnostic in diagnostics {
            self.issues.push(Issue {
                file: diagnostic.file.clone(),
                message: diagnostic.message.clone(),
                severity: diagnostic.severity(),
                line: diagnostic.line,
                column: diagnostic.column,
            });
        }
    }

    /// Map Schematron assertions onto issues. Informational assertions
    /// are dropped here; an empty role defaults to error; missing
    /// positions default to zero.
    pub fn add_assertions<'a>(
        &mut self,
        assertions: impl IntoIterator<Item = &'a SchematronAssertion>,
    ) {
        for assertion in assertions {
            if assertion.role == "information" {
                continue;
            }
            let file = match &self.working_dir {
                Some(base) => relative_to(&assertion.document, base),
                None => assertion.document.clone(),
            };
            self.issues.push(Issue {
                file,
                message: assertion.text.clone(),
                severity: Severity::from_schematron_role(&assertion.role),
                line: assertion.line.unwrap_or(0),
                column: assertion.column.unwrap_or(0),
            });
        }
    }

    /// Compute statistics and yield the report. Issues keep the order
    /// their source diagnostics were discovered in.
    pub fn finish(self) -> ValidationReport {
        let mut seen_files = HashSet::new();
        let mut seen_messages = HashSet::new();
        let mut files_with_issues = 0;
        let mut unique_issues = 0;
        let mut errors = 0;
        let mut warnings = 0;

        for issue in &self.issues {
            if seen_files.insert(issue.file.clone()) {
                files_with_issues += 1;
            }
            if seen_messages.insert(issue.message.clone()) {
                unique_issues += 1;
            }
            match issue.severity {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
                Severity::Information => {}
            }
        }

        let stats = ReportStats {
            total_files: self.total_files,
            files_with_issues,
            total_issues: self.issues.len(),
            unique_issues,
            errors,
            warnings,
        };
        ValidationReport {
            issues: self.issues,
            stats,
        }
    }
}
