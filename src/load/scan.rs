use super::{ingest_csv, TableSink};
use crate::config::Config;
use anyhow::{Context, Result};
use glob::Pattern;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing::{error, info, warn};

/// Knobs for one directory scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub chunk_size: usize,
    /// Tables matching any of these are loaded elsewhere and skipped here.
    pub exclude: Vec<Pattern>,
}

impl ScanOptions {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            chunk_size: cfg.chunk_size,
            exclude: cfg.exclude_patterns()?,
        })
    }
}

/// What happened to each CSV in the directory.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// `(table, rows written)`
    pub loaded: Vec<(String, u64)>,
    /// `(file, error chain)`
    pub failed: Vec<(PathBuf, String)>,
    pub skipped: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// Table name for a source file: the file stem with spaces turned into `_`.
pub fn table_name_for(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.replace(' ', "_"))
}

fn is_csv(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
}

/// Sorted CSV paths among `entries`. An entry that can't be read is logged and left out.
fn csv_files<I>(entries: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = io::Result<PathBuf>>,
{
    let mut files: Vec<PathBuf> = entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable directory entry: {}", e);
                None
            }
        })
        .filter(|path| is_csv(path))
        .collect();
    files.sort();
    files
}

/// Ingest every CSV in `source_dir` into a same-named table, one file at a time.
///
/// A file that fails to load is logged and recorded in the report; the scan
/// carries on with the next file. Only a directory that can't be opened is an error.
pub fn load_raw_data<S>(source_dir: &Path, sink: &mut S, opts: &ScanOptions) -> Result<ScanReport>
where
    S: TableSink + ?Sized,
{
    let start = Instant::now();
    let mut report = ScanReport::default();

    let entries = fs::read_dir(source_dir)
        .with_context(|| format!("reading directory {:?}", source_dir))?
        .map(|entry| entry.map(|e| e.path()));
    let files = csv_files(entries);
    info!(dir = %source_dir.display(), files = files.len(), "found CSV files");

    for path in files {
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(table) = table_name_for(&path) else {
            warn!("Skipping {}: file name is not valid UTF-8", path.display());
            report.skipped.push(path);
            continue;
        };
        if opts.exclude.iter().any(|p| p.matches(&table)) {
            info!("Skipping {} (table {} is excluded)", file, table);
            report.skipped.push(path);
            continue;
        }

        info!("Attempting to ingest {} as table {}", file, table);
        match ingest_csv(&path, &table, sink, opts.chunk_size) {
            Ok(rows) => {
                info!("{} ingested successfully with {} rows", table, rows);
                report.loaded.push((table, rows));
            }
            Err(e) => {
                error!("Failed to ingest {}: {:#}", file, e);
                report.failed.push((path, format!("{:#}", e)));
            }
        }
    }

    report.elapsed = start.elapsed();
    info!("------------- Ingestion Complete -------------");
    info!(
        "Total Time Taken: {:.2} minutes",
        report.elapsed.as_secs_f64() / 60.0
    );
    Ok(report)
}
