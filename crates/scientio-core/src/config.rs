//! Configuration management for Scientio sessions.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (SCIENTIO_ prefix, `__` section separator)
//! 2. Config file (scientio.toml)
//! 3. Defaults

use serde::Deserialize;

use crate::error::ScientioError;
use crate::ontology::SchemaRegistry;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScientioConfig {
    #[serde(default)]
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub ontology: OntologySettings,
}

/// Connection settings for the Neo4j driver.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Name of the operations driver (default: "neo4j").
    #[serde(default = "default_driver")]
    pub driver: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OntologySettings {
    /// Schema source file (YAML, or JSON by `.json` extension).
    pub path: Option<String>,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_driver() -> String {
    "neo4j".to_string()
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            driver: default_driver(),
        }
    }
}

impl ScientioConfig {
    /// Load configuration from `<file_prefix>.{toml,yaml,json}` (optional)
    /// overlaid with `SCIENTIO__SECTION__KEY` environment variables.
    pub fn load(file_prefix: &str) -> Result<Self, ScientioError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("SCIENTIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }

    /// Load the schema registry named by `ontology.path`.
    pub fn load_ontology(&self) -> Result<SchemaRegistry, ScientioError> {
        let path = self
            .ontology
            .path
            .as_deref()
            .ok_or(ScientioError::MissingOntology)?;
        Ok(SchemaRegistry::load(path)?)
    }
}
