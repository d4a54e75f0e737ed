//! Report rendering: terminal output and the GitHub step summary.

use std::path::Path;

use log::warn;

use crate::aggregate::ValidationReport;
use crate::cli::VerbosityLevel;
use crate::config::EnvProvider;
use crate::diagnostics::Issue;
use crate::error::Result;

/// Messages longer than this are cut for display; deduplication always
/// uses the full message.
const MAX_MESSAGE_CHARS: usize = 200;

/// jing likes to enumerate every element the content model would allow;
/// keep the head of the message and drop the tail.
pub fn truncate_message(message: &str) -> String {
    let mut chars = message.char_indices();
    match chars.nth(MAX_MESSAGE_CHARS) {
        Some((cut, _)) => format!("{}\u{2026}", &message[..cut]),
        None => message.to_string(),
    }
}

/// Simple output formatter for human-readable results
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    #[cfg(test)]
    fn plain(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_report(&self, report: &ValidationReport, title: &str) -> String {
        let mut output = String::new();

        if self.verbosity == VerbosityLevel::Quiet {
            if report.has_errors() {
                output.push_str(&format!(
                    "Errors: {} Warnings: {}\n",
                    report.stats.errors, report.stats.warnings
                ));
            }
            return output;
        }

        output.push_str(&format!("Validation against {}\n", title));
        output.push_str(&format!(
            "  Total files validated: {}\n",
            report.stats.total_files
        ));
        output.push_str(&format!(
            "  Files with issues: {}\n",
            report.stats.files_with_issues
        ));
        if report.stats.total_issues > 0 {
            output.push_str(&format!(
                "  Total number of issues: {}\n",
                report.stats.total_issues
            ));
            output.push_str(&format!("  Unique issues: {}\n", report.stats.unique_issues));
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Errors:", "31"),
                report.stats.errors
            ));
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Warnings:", "33"),
                report.stats.warnings
            ));
        }

        if self.verbosity >= VerbosityLevel::Verbose {
            for issue in &report.issues {
                output.push('\n');
                output.push_str(&self.format_issue(issue));
            }
            if !report.issues.is_empty() {
                output.push('\n');
            }
        }

        output
    }

    fn format_issue(&self, issue: &Issue) -> String {
        format!(
            "{} {}:{}:{} {}",
            issue.severity.glyph(),
            issue.file.display(),
            issue.line,
            issue.column,
            truncate_message(&issue.message)
        )
    }
}

/// GitHub-flavored markdown renderer for the step summary.
pub struct SummaryRenderer<'a> {
    env: &'a dyn EnvProvider,
}

impl<'a> SummaryRenderer<'a> {
    pub fn new(env: &'a dyn EnvProvider) -> Self {
        Self { env }
    }

    pub fn render(&self, report: &ValidationReport, title: &str) -> String {
        let mut markdown = String::new();
        markdown.push_str(&format!("## Validation against {}\n\n", title));

        markdown.push_str(&format!(
            "- Total files validated: {}\n",
            report.stats.total_files
        ));
        markdown.push_str(&format!(
            "- Files with issues: {}\n",
            report.stats.files_with_issues
        ));
        if report.stats.total_issues > 0 {
            markdown.push_str(&format!(
                "- Total number of issues: {}\n",
                report.stats.total_issues
            ));
            markdown.push_str(&format!("- Unique issues: {}\n", report.stats.unique_issues));
            markdown.push_str(&format!("- Errors: {}\n", report.stats.errors));
            markdown.push_str(&format!("- Warnings: {}\n", report.stats.warnings));
        }

        if !report.issues.is_empty() {
            markdown.push('\n');
            markdown.push_str("| File | Line:Col | Type | Message |\n");
            markdown.push_str("| --- | --- | --- | --- |\n");
            for issue in &report.issues {
                markdown.push_str(&format!(
                    "| {} | {}:{} | {} | {} |\n",
                    self.file_link(&issue.file, issue.line),
                    issue.line,
                    issue.column,
                    issue.severity.glyph(),
                    truncate_message(&issue.message)
                ));
            }
        }
        markdown
    }

    /// Link a file cell to the blob view of the validated commit when the
    /// GitHub environment is available; otherwise render the plain path.
    fn file_link(&self, file: &Path, line: u32) -> String {
        let path = file.display();
        match (
            self.env.get("GITHUB_SERVER_URL"),
            self.env.get("GITHUB_REPOSITORY"),
            self.env.get("GITHUB_SHA"),
        ) {
            (Some(server), Some(repository), Some(sha)) => {
                format!("[{path}]({server}/{repository}/blob/{sha}/{path}#L{line})")
            }
            _ => path.to_string(),
        }
    }

    /// Append the markdown to the step-summary file when running under
    /// GitHub Actions; print it otherwise.
    pub async fn write(&self, markdown: &str) -> Result<()> {
        match self.env.get("GITHUB_STEP_SUMMARY") {
            Some(path) if !path.is_empty() => {
                use tokio::io::AsyncWriteExt;
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await?;
                file.write_all(markdown.as_bytes()).await?;
                file.flush().await?;
            }
            _ => {
                warn!("GITHUB_STEP_SUMMARY not set, printing summary");
                println!("{markdown}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::IssueAggregator;
    use crate::diagnostics::RawLineDiagnostic;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct FakeEnv(HashMap<String, String>);

    impl EnvProvider for FakeEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
    }

    fn sample_report() -> ValidationReport {
        let mut aggregator = IssueAggregator::new(2);
        aggregator.add_line_diagnostics(&[
            RawLineDiagnostic {
                file: PathBuf::from("tei/hamlet.xml"),
                line: 10,
                column: 36,
                severity_token: "error".to_string(),
                message: "attribute \"foo\" not allowed".to_string(),
            },
            RawLineDiagnostic {
                file: PathBuf::from("tei/lear.xml"),
                line: 3,
                column: 1,
                severity_token: "warning".to_string(),
                message: "odd spacing".to_string(),
            },
        ]);
        aggregator.finish()
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short"), "short");

        let long = "x".repeat(500);
        let truncated = truncate_message(&long);
        assert_eq!(truncated.chars().count(), MAX_MESSAGE_CHARS + 1);
        assert!(truncated.ends_with('\u{2026}'));
    }

    #[test]
    fn test_terminal_summary() {
        let output = Output::plain(VerbosityLevel::Normal);
        let formatted = output.format_report(&sample_report(), "TEI-All 4.9.0");

        assert!(formatted.contains("Validation against TEI-All 4.9.0"));
        assert!(formatted.contains("Total files validated: 2"));
        assert!(formatted.contains("Errors: 1"));
        assert!(formatted.contains("Warnings: 1"));
        // Issue rows only appear in verbose mode.
        assert!(!formatted.contains("hamlet.xml:10"));
    }

    #[test]
    fn test_terminal_verbose_lists_issues() {
        let output = Output::plain(VerbosityLevel::Verbose);
        let formatted = output.format_report(&sample_report(), "TEI-All 4.9.0");

        assert!(formatted.contains("tei/hamlet.xml:10:36"));
        assert!(formatted.contains("tei/lear.xml:3:1"));
    }

    #[test]
    fn test_quiet_mode_only_reports_failures() {
        let output = Output::plain(VerbosityLevel::Quiet);
        let formatted = output.format_report(&sample_report(), "TEI-All 4.9.0");
        assert_eq!(formatted, "Errors: 1 Warnings: 1\n");

        let empty = IssueAggregator::new(0).finish();
        assert!(output.format_report(&empty, "TEI-All 4.9.0").is_empty());
    }

    #[test]
    fn test_markdown_table_without_github_env() {
        let env = FakeEnv(HashMap::new());
        let renderer = SummaryRenderer::new(&env);

        let markdown = renderer.render(&sample_report(), "TEI-All 4.9.0");

        assert!(markdown.contains("## Validation against TEI-All 4.9.0"));
        assert!(markdown.contains("| File | Line:Col | Type | Message |"));
        assert!(markdown.contains("| tei/hamlet.xml | 10:36 | \u{274c} | attribute \"foo\" not allowed |"));
        assert!(markdown.contains("| tei/lear.xml | 3:1 | \u{26a0}\u{fe0f} | odd spacing |"));
    }

    #[test]
    fn test_markdown_links_with_github_env() {
        let env = FakeEnv(HashMap::from([
            (
                "GITHUB_SERVER_URL".to_string(),
                "https://github.com".to_string(),
            ),
            ("GITHUB_REPOSITORY".to_string(), "dracor-org/testdata".to_string()),
            ("GITHUB_SHA".to_string(), "abc123".to_string()),
        ]));
        let renderer = SummaryRenderer::new(&env);

        let markdown = renderer.render(&sample_report(), "TEI-All 4.9.0");

        assert!(markdown.contains(
            "[tei/hamlet.xml](https://github.com/dracor-org/testdata/blob/abc123/tei/hamlet.xml#L10)"
        ));
    }

    #[test]
    fn test_markdown_stats_for_clean_run() {
        let env = FakeEnv(HashMap::new());
        let renderer = SummaryRenderer::new(&env);
        let clean = IssueAggregator::new(3).finish();

        let markdown = renderer.render(&clean, "TEI-All 4.9.0");

        assert!(markdown.contains("- Total files validated: 3"));
        assert!(markdown.contains("- Files with issues: 0"));
        // Issue counters and the table are omitted entirely.
        assert!(!markdown.contains("Total number of issues"));
        assert!(!markdown.contains("| File |"));
    }

    #[tokio::test]
    async fn test_write_appends_to_step_summary_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let summary_path = dir.path().join("summary.md");
        let env = FakeEnv(HashMap::from([(
            "GITHUB_STEP_SUMMARY".to_string(),
            summary_path.to_string_lossy().into_owned(),
        )]));

        let renderer = SummaryRenderer::new(&env);
        renderer.write("first\n").await.unwrap();
        renderer.write("second\n").await.unwrap();

        let written = tokio::fs::read_to_string(&summary_path).await.unwrap();
        assert_eq!(written, "first\nsecond\n");
    }
}
