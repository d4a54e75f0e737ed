use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{SchemaFamily, SchemaSelection, ToolsConfig};
use crate::error::ConfigResult;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
}

/// Rendering target for the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output.
    #[default]
    Human,
    /// The GitHub-flavored markdown summary.
    Markdown,
    /// The full report as JSON.
    Json,
}

/// Validate XML documents against TEI/DraCor schemas in CI
#[derive(Parser, Debug, Clone)]
#[command(name = "validate-tei")]
#[command(about = "Validate XML files with jing and SchXslt and report normalized issues")]
#[command(version)]
pub struct Cli {
    /// Files or glob patterns to validate
    #[arg(required = true, help = "XML files or glob patterns to validate")]
    pub files: Vec<String>,

    /// Schema family to validate against
    #[arg(long = "schema", value_enum, default_value_t = SchemaFamily::Tei)]
    pub schema: SchemaFamily,

    /// Schema version (defaults to the family's current release)
    #[arg(long = "schema-version")]
    pub schema_version: Option<String>,

    /// Report errors but exit successfully
    #[arg(long = "warn-only")]
    pub warn_only: bool,

    /// Report output format
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// TOML file with tool locations
    #[arg(long = "config")]
    pub config_file: Option<PathBuf>,

    /// Directory holding the schema files
    #[arg(long = "schema-dir")]
    pub schema_dir: Option<PathBuf>,

    /// jing executable
    #[arg(long = "jing")]
    pub jing: Option<String>,

    /// java executable for the SchXslt CLI
    #[arg(long = "java")]
    pub java: Option<String>,

    /// Path to schxslt-cli.jar
    #[arg(long = "schxslt-jar")]
    pub schxslt_jar: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Main application configuration derived from CLI and config file
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub files: Vec<String>,
    pub schema: SchemaSelection,
    pub tools: ToolsConfig,
    pub warn_only: bool,
    pub format: OutputFormat,
    pub verbosity: VerbosityLevel,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> ConfigResult<Self> {
        let mut tools = ToolsConfig::load(cli.config_file.as_deref())?;
        if let Some(jing) = &cli.jing {
            tools.jing = jing.clone();
        }
        if let Some(java) = &cli.java {
            tools.java = java.clone();
        }
        if let Some(jar) = &cli.schxslt_jar {
            tools.schxslt_jar = jar.clone();
        }
        if let Some(dir) = &cli.schema_dir {
            tools.schema_dir = dir.clone();
        }

        let schema = SchemaSelection::resolve(
            cli.schema,
            cli.schema_version.as_deref(),
            &tools.schema_dir,
        );

        Ok(Self {
            files: cli.files.clone(),
            schema,
            tools,
            warn_only: cli.warn_only,
            format: cli.format,
            verbosity: cli.verbosity(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_basic_cli_parsing() {
        let args = vec!["validate-tei", "tei/*.xml"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.files, vec!["tei/*.xml".to_string()]);
        assert_eq!(cli.schema, SchemaFamily::Tei);
        assert!(!cli.warn_only);
    }

    #[test]
    fn test_requires_at_least_one_file() {
        let args = vec!["validate-tei"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let args = vec!["validate-tei", "a.xml", "--quiet", "--verbose"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_run_config_applies_cli_overrides() {
        let args = vec![
            "validate-tei",
            "plays/hamlet.xml",
            "--schema",
            "dracor",
            "--schema-version",
            "0.9.2",
            "--schema-dir",
            "/opt/schemas",
            "--jing",
            "/usr/local/bin/jing",
            "--warn-only",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let config = RunConfig::from_cli(&cli).unwrap();

        assert_eq!(config.schema.title, "DraCor Schema 0.9.2");
        assert_eq!(
            config.schema.rng_file,
            PathBuf::from("/opt/schemas/dracor_0.9.2.rng")
        );
        assert_eq!(config.tools.jing, "/usr/local/bin/jing");
        assert!(config.warn_only);
        assert_eq!(config.format, OutputFormat::Human);
    }
}
