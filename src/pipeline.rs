//! End-to-end validation pipeline.
//!
//! One run: resolve the input list, run jing once over all files, parse
//! its line diagnostics, then (when the schema family carries Schematron
//! rules) run SchXslt per file and fold each SVRL report into the issue
//! list. Everything executes sequentially; the document cache and the
//! accumulating issue list are single-writer state.

use log::{debug, error, warn};

use crate::aggregate::{IssueAggregator, ValidationReport};
use crate::cli::RunConfig;
use crate::diagnostics::LineDiagnosticParser;
use crate::error::Result;
use crate::file_discovery::FileDiscovery;
use crate::locator::LocationResolver;
use crate::runner::{JingRunner, SchxsltRunner};
use crate::svrl;

pub struct ValidationPipeline {
    config: RunConfig,
}

impl ValidationPipeline {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<ValidationReport> {
        let files = FileDiscovery::new().resolve(&self.config.files).await?;
        if files.is_empty() {
            warn!("no files found ('{}')", self.config.files.join(" "));
            return Ok(IssueAggregator::new(0).finish());
        }
        debug!("validating {} file(s)", files.len());

        let working_dir = std::env::current_dir()?;
        let mut aggregator =
            IssueAggregator::new(files.len()).with_working_dir(working_dir.clone());

        let jing = JingRunner::new(&self.config.tools, self.config.schema.rng_file.clone());
        let run = jing.run(&files).await?;
        if run.passed {
            debug!("jing ran successfully");
        } else {
            debug!("jing exited with errors");
        }

        let parser = LineDiagnosticParser::new(working_dir);
        aggregator.add_line_diagnostics(&parser.parse(&run.output));

        if let Some(schematron_file) = &self.config.schema.schematron_file {
            let schxslt = SchxsltRunner::new(&self.config.tools, schematron_file.clone())?;
            let mut resolver = LocationResolver::new();
            for (index, file) in files.iter().enumerate() {
                let report = schxslt.run(file, index).await?;
                // A failure here is local to one document; the other
                // files still get their reports.
                match svrl::parse_report(&report, &mut resolver).await {
                    Ok(assertions) => aggregator.add_assertions(&assertions),
                    Err(e) => error!(
                        "skipping schematron report for {}: {}",
                        file.display(),
                        e
                    ),
                }
            }
        }

        Ok(aggregator.finish())
    }
}
