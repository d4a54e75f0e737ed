//! Schema registry and tool configuration.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default TEI-All release used when no version is given.
pub const TEI_VERSION: &str = "4.9.0";
/// Default DraCor schema release used when no version is given.
pub const DRACOR_VERSION: &str = "1.0.0";

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Supported schema families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFamily {
    /// TEI-All, RELAX NG only.
    Tei,
    /// DraCor, RELAX NG plus Schematron rules.
    Dracor,
}

impl SchemaFamily {
    pub fn from_name(name: &str) -> ConfigResult<Self> {
        match name {
            "tei" => Ok(SchemaFamily::Tei),
            "dracor" => Ok(SchemaFamily::Dracor),
            other => Err(ConfigError::UnknownSchema(other.to_string())),
        }
    }

    pub fn default_version(&self) -> &'static str {
        match self {
            SchemaFamily::Tei => TEI_VERSION,
            SchemaFamily::Dracor => DRACOR_VERSION,
        }
    }

    fn title(&self, version: &str) -> String {
        match self {
            SchemaFamily::Tei => format!("TEI-All {version}"),
            SchemaFamily::Dracor => format!("DraCor Schema {version}"),
        }
    }

    fn rng_file_name(&self, version: &str) -> String {
        match self {
            SchemaFamily::Tei => format!("tei_all_{version}.rng"),
            SchemaFamily::Dracor => format!("dracor_{version}.rng"),
        }
    }

    fn schematron_file_name(&self, version: &str) -> Option<String> {
        match self {
            SchemaFamily::Tei => None,
            SchemaFamily::Dracor => Some(format!("dracor_{version}.sch")),
        }
    }
}

/// Resolved schema selection for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSelection {
    pub family: SchemaFamily,
    pub version: String,
    /// Human-readable title used in the report heading.
    pub title: String,
    pub rng_file: PathBuf,
    pub schematron_file: Option<PathBuf>,
}

impl SchemaSelection {
    pub fn resolve(family: SchemaFamily, version: Option<&str>, schema_dir: &Path) -> Self {
        let version = version.unwrap_or_else(|| family.default_version()).to_string();
        Self {
            title: family.title(&version),
            rng_file: schema_dir.join(family.rng_file_name(&version)),
            schematron_file: family
                .schematron_file_name(&version)
                .map(|name| schema_dir.join(name)),
            family,
            version,
        }
    }
}

/// External tool locations, overridable from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// jing executable.
    pub jing: String,
    /// java executable used to run the SchXslt CLI.
    pub java: String,
    /// Path to schxslt-cli.jar.
    pub schxslt_jar: PathBuf,
    /// Directory holding the .rng/.sch schema files.
    pub schema_dir: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            jing: "jing".to_string(),
            java: "java".to_string(),
            schxslt_jar: PathBuf::from("/usr/src/app/schxslt-cli.jar"),
            schema_dir: default_schema_dir(),
        }
    }
}

/// Partial shape of the TOML config file; every field is optional and
/// falls back to the default.
#[derive(Debug, Default, Deserialize)]
struct ToolsConfigFile {
    jing: Option<String>,
    java: Option<String>,
    schxslt_jar: Option<PathBuf>,
    schema_dir: Option<PathBuf>,
}

impl ToolsConfig {
    /// Load tool locations, merging an optional TOML file over the
    /// defaults.
    pub fn load(config_file: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::default();
        if let Some(path) = config_file {
            let text = std::fs::read_to_string(path)?;
            let file: ToolsConfigFile = toml::from_str(&text)?;
            if let Some(jing) = file.jing {
                config.jing = jing;
            }
            if let Some(java) = file.java {
                config.java = java;
            }
            if let Some(jar) = file.schxslt_jar {
                config.schxslt_jar = jar;
            }
            if let Some(dir) = file.schema_dir {
                config.schema_dir = dir;
            }
        }
        Ok(config)
    }
}

/// The schema directory ships next to the installed binary; fall back to
/// a plain relative `schemas` when the executable path is unavailable.
fn default_schema_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .map(|dir| dir.join("schemas"))
        .unwrap_or_else(|| PathBuf::from("schemas"))
}
