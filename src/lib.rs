//! # validate-tei Library
//!
//! CI validation step for TEI/DraCor XML corpora: runs jing (RELAX NG)
//! and the SchXslt Schematron processor, correlates their diagnostic
//! output back to source positions, and aggregates everything into one
//! normalized issue list with summary statistics.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod file_discovery;
pub mod locator;
pub mod output;
pub mod pipeline;
pub mod runner;
pub mod svrl;

pub use aggregate::{IssueAggregator, ReportStats, ValidationReport};
pub use cli::{Cli, OutputFormat, RunConfig, VerbosityLevel};
pub use config::{EnvProvider, SchemaFamily, SchemaSelection, SystemEnvProvider, ToolsConfig};
pub use diagnostics::{Issue, LineDiagnosticParser, RawLineDiagnostic, Severity};
pub use error::{ConfigError, ReportError, Result};
pub use file_discovery::FileDiscovery;
pub use locator::{DocumentCache, DocumentIndex, LocationResolver, Position};
pub use output::{Output, SummaryRenderer};
pub use pipeline::ValidationPipeline;
pub use runner::{JingRun, JingRunner, SchxsltRunner};
pub use svrl::{parse_report, sanitize_for_display, SchematronAssertion};
