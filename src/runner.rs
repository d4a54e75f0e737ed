//! External validator invocation (jing and the SchXslt CLI).
//!
//! Both validators run as child processes. jing is invoked once over the
//! whole file list; SchXslt once per file, writing its SVRL report into a
//! per-run temp directory. An executable that cannot be launched is a run
//! failure; a validator that launches and exits nonzero is not, since
//! invalid documents are exactly what it is there to find.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;
use tokio::process::Command;

use crate::config::ToolsConfig;
use crate::error::{ReportError, Result};

/// Captured outcome of one jing run.
#[derive(Debug, Clone)]
pub struct JingRun {
    /// Full stdout of the run; one diagnostic per line plus noise.
    pub output: String,
    /// Whether jing exited cleanly (all documents valid).
    pub passed: bool,
}

/// Runs jing over a set of files against one RELAX NG schema.
#[derive(Debug, Clone)]
pub struct JingRunner {
    command: String,
    rng_file: PathBuf,
}

impl JingRunner {
    pub fn new(tools: &ToolsConfig, rng_file: PathBuf) -> Self {
        Self {
            command: tools.jing.clone(),
            rng_file,
        }
    }

    /// One invocation covers all files at once.
    pub async fn run(&self, files: &[PathBuf]) -> Result<JingRun> {
        let output = Command::new(&self.command)
            .arg(&self.rng_file)
            .args(files)
            .output()
            .await
            .map_err(|e| ReportError::ToolLaunch {
                tool: self.command.clone(),
                details: e.to_string(),
            })?;

        debug!("jing exited with {}", output.status);
        if !output.stderr.is_empty() {
            debug!("jing stderr: {}", String::from_utf8_lossy(&output.stderr));
        }

        Ok(JingRun {
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
            passed: output.status.success(),
        })
    }
}

/// Runs the SchXslt CLI on one file at a time.
///
/// Owns the temp directory the SVRL reports are written to; dropping the
/// runner removes the reports.
#[derive(Debug)]
pub struct SchxsltRunner {
    java: String,
    jar: PathBuf,
    schema: PathBuf,
    report_dir: TempDir,
}

impl SchxsltRunner {
    pub fn new(tools: &ToolsConfig, schema: PathBuf) -> Result<Self> {
        let report_dir = tempfile::Builder::new().prefix("report-").tempdir()?;
        Ok(Self {
            java: tools.java.clone(),
            jar: tools.schxslt_jar.clone(),
            schema,
            report_dir,
        })
    }

    /// Validate one file, returning the SVRL report path. A failed
    /// processor run is logged and still returns the path: the report
    /// will be missing or partial and the SVRL parser degrades to an
    /// empty assertion list.
    pub async fn run(&self, input: &Path, index: usize) -> Result<PathBuf> {
        let report = self.report_dir.path().join(format!("svrl-{index}.xml"));
        let output = Command::new(&self.java)
            .arg("-jar")
            .arg(&self.jar)
            .arg("-d")
            .arg(input)
            .arg("-s")
            .arg(&self.schema)
            .arg("-o")
            .arg(&report)
            .output()
            .await
            .map_err(|e| ReportError::ToolLaunch {
                tool: self.java.clone(),
                details: e.to_string(),
            })?;

        if output.status.success() {
            debug!("schxslt ran successfully on {}", input.display());
        } else {
            warn!(
                "schxslt failed for {}: {}",
                input.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(report)
    }
}
