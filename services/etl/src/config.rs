//! Runtime configuration.
//!
//! Connection and directory settings come from the environment (a `.env`
//! file is honoured by the binaries). The list of sources comes from a
//! JSON file or from the `SOURCES` variable holding the same JSON.

use crate::error::{EtlError, Result};
use crate::schema::{CategorySchema, FieldSpec};
use crate::snapshot::MonthLocale;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

/// One configured source.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub category: String,
    pub link: String,
    /// Declared numeric/flag fields; built-in schema when absent.
    #[serde(default)]
    pub fields: Option<Vec<FieldSpec>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Source {
    pub fn schema(&self) -> CategorySchema {
        CategorySchema::resolve(&self.category, self.fields.as_deref())
    }
}

/// Contents of a sources file.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub sources: Vec<Source>,
    /// Extra value corrections per field, merged over the built-in maps.
    #[serde(default)]
    pub corrections: BTreeMap<String, BTreeMap<String, String>>,
}

impl SourcesConfig {
    /// Accepts either `{"sources": [...]}` or a bare list of sources.
    pub fn from_json(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Full(SourcesConfig),
            List(Vec<Source>),
        }

        let raw: Raw = serde_json::from_str(content)
            .map_err(|e| EtlError::Config(format!("failed to parse sources: {}", e)))?;
        Ok(match raw {
            Raw::Full(config) => config,
            Raw::List(sources) => SourcesConfig {
                sources,
                corrections: BTreeMap::new(),
            },
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| EtlError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Sources file if given, else the `SOURCES` variable.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let content = std::env::var("SOURCES").map_err(|_| {
                    EtlError::Config("no --config given and SOURCES env var missing".to_string())
                })?;
                Self::from_json(&content)
            }
        }
    }

    /// Enabled sources, optionally restricted to one category.
    pub fn selected(&self, category: Option<&str>) -> Vec<&Source> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .filter(|s| category.map_or(true, |c| s.category == c))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: String,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub locale: MonthLocale,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_url = match std::env::var("DB_URL") {
            Ok(url) => url,
            Err(_) => format!(
                "postgresql://{}:{}@{}:{}/{}",
                env_or("DB_USER", "root"),
                env_or("DB_PASSWORD", "root"),
                env_or("DB_HOST", "localhost"),
                env_or("DB_PORT", "5432"),
                env_or("DB_NAME", "db"),
            ),
        };
        Ok(Self {
            db_url,
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            log_dir: PathBuf::from(env_or("LOG_DIR", "logs")),
            locale: env_or("SNAPSHOT_LOCALE", "es").parse()?,
        })
    }
}
