use crate::config::Config;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Flags shared by every binary. Anything given here overrides the config file.
#[derive(Parser, Debug, Default)]
#[command(version, about = "Load vendor CSVs into DuckDB and build the vendor sales summary")]
pub struct Args {
    /// YAML config file; built-in defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the source CSV files.
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// DuckDB database file, or `:memory:`.
    #[arg(long)]
    pub database: Option<String>,

    /// Rows per chunk.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Table-name glob to leave out of directory ingestion (repeatable).
    /// Replaces the configured list when given.
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,
}

impl Args {
    pub fn resolve(self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(dir) = self.source_dir {
            cfg.source_dir = dir;
        }
        if let Some(db) = self.database {
            cfg.database.path = db;
        }
        if let Some(n) = self.chunk_size {
            cfg.chunk_size = n;
        }
        if !self.exclude.is_empty() {
            cfg.exclude_tables = self.exclude;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() -> Result<()> {
        let args = Args::try_parse_from([
            "vendor-etl",
            "--source-dir",
            "/srv/vendor/data",
            "--chunk-size",
            "1000",
            "--exclude",
            "sales",
            "--exclude",
            "begin_inventory",
        ])?;
        let cfg = args.resolve()?;
        assert_eq!(cfg.source_dir, PathBuf::from("/srv/vendor/data"));
        assert_eq!(cfg.chunk_size, 1000);
        assert_eq!(cfg.exclude_tables, vec!["sales", "begin_inventory"]);
        assert_eq!(cfg.database.path, "inventory.duckdb");
        Ok(())
    }

    #[test]
    fn zero_chunk_size_flag_is_rejected() -> Result<()> {
        let args = Args::try_parse_from(["vendor-etl", "--chunk-size", "0"])?;
        assert!(args.resolve().is_err());
        Ok(())
    }
}
