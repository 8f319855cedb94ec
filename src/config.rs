use anyhow::{bail, Context, Result};
use glob::Pattern;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Rows per chunk when nothing else is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// Everything a run needs, injected at process start.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: DatabaseConfig,
    /// Directory scanned for `.csv` files.
    pub source_dir: PathBuf,
    pub chunk_size: usize,
    /// Glob patterns matched against derived table names; matches are not ingested.
    pub exclude_tables: Vec<String>,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB database file, or `:memory:`.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub file: String,
    /// `EnvFilter` directive, e.g. `debug` or `info,vendor_etl::load=debug`.
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            source_dir: PathBuf::from("data"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            exclude_tables: vec!["sales".to_string()],
            log: LogConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "inventory.duckdb".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file: "ingestion_db.log".to_string(),
            level: "debug".to_string(),
        }
    }
}

impl LogConfig {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }
}

impl Config {
    /// Parse a YAML config file. Missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {:?}", path))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        for pat in &self.exclude_tables {
            Pattern::new(pat).with_context(|| format!("invalid exclude pattern {:?}", pat))?;
        }
        Ok(())
    }

    /// Compiled exclusion patterns; call after `validate`.
    pub fn exclude_patterns(&self) -> Result<Vec<Pattern>> {
        self.exclude_tables
            .iter()
            .map(|p| Pattern::new(p).with_context(|| format!("invalid exclude pattern {:?}", p)))
            .collect()
    }
}
