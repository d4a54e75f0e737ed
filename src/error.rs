use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source document is not well-formed XML: {path} - {details}")]
    DocumentParse { path: PathBuf, details: String },

    #[error("failed to launch {tool}: {details}")]
    ToolLaunch { tool: String, details: String },

    #[error("document cache lookup failed: {path}")]
    CacheLookup { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("unknown schema \"{0}\"")]
    UnknownSchema(String),

    #[error("invalid glob pattern '{pattern}': {details}")]
    InvalidGlob { pattern: String, details: String },
}

impl From<ConfigError> for ReportError {
    fn from(err: ConfigError) -> Self {
        ReportError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ReportError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
