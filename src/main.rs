use anyhow::Result;
use clap::Parser;
use vendor_etl::{cli::Args, config::Config, duck::DuckStore, logging, pipeline::run_pipeline};
use tracing::{error, info};

fn main() -> Result<()> {
    let cfg = Args::parse().resolve()?;
    logging::init(&cfg.log)?;
    info!("startup");

    // a failed run is logged, never turned into a non-zero exit
    if let Err(e) = run(&cfg) {
        error!("run aborted: {:?}", e);
    }
    info!("all done");
    Ok(())
}

fn run(cfg: &Config) -> Result<()> {
    let mut store = DuckStore::open(&cfg.database.path)?;
    run_pipeline(cfg, &mut store);
    Ok(())
}
