use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use vendor_etl::{
    cli::Args,
    duck::DuckStore,
    load::{load_raw_data, ScanOptions},
    logging,
};

/// Load every CSV in the source directory into its own table.
fn main() -> Result<()> {
    let cfg = Args::parse().resolve()?;
    logging::init(&cfg.log)?;

    let result = DuckStore::open(&cfg.database.path).and_then(|mut store| {
        let opts = ScanOptions::from_config(&cfg)?;
        load_raw_data(&cfg.source_dir, &mut store, &opts)
    });
    match result {
        Ok(report) => {
            for (file, err) in &report.failed {
                error!("not loaded: {} ({})", file.display(), err);
            }
            info!(
                loaded = report.loaded.len(),
                failed = report.failed.len(),
                "ingestion finished"
            );
        }
        Err(e) => error!("ingestion aborted: {:?}", e),
    }
    Ok(())
}
