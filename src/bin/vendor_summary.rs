use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use vendor_etl::{cli::Args, duck::DuckStore, logging, summary::run_vendor_summary};

/// Rebuild `vendor_sales_summary` from tables already in the database.
fn main() -> Result<()> {
    let cfg = Args::parse().resolve()?;
    logging::init(&cfg.log)?;

    match DuckStore::open(&cfg.database.path) {
        Ok(mut store) => {
            let outcome = run_vendor_summary(&mut store);
            info!(?outcome, "vendor summary finished");
        }
        Err(e) => error!("cannot open database: {:?}", e),
    }
    Ok(())
}
