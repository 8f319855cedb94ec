use crate::{
    config::Config,
    load::{load_raw_data, ScanOptions, ScanReport, TableSink, TableSource},
    summary::{run_vendor_summary, SummaryOutcome},
};
use tracing::{error, info};

/// Ingest the source directory, then rebuild the vendor summary.
///
/// A scan that can't start is logged and the summary still runs over whatever
/// tables the store already holds.
pub fn run_pipeline<S>(cfg: &Config, store: &mut S) -> (Option<ScanReport>, SummaryOutcome)
where
    S: TableSink + TableSource + ?Sized,
{
    // ─── 1) base tables ──────────────────────────────────────────────
    let report = ScanOptions::from_config(cfg)
        .and_then(|opts| load_raw_data(&cfg.source_dir, store, &opts));
    let report = match report {
        Ok(report) => {
            info!(
                loaded = report.loaded.len(),
                failed = report.failed.len(),
                skipped = report.skipped.len(),
                "ingestion finished"
            );
            Some(report)
        }
        Err(e) => {
            error!("Ingestion skipped: {:#}", e);
            None
        }
    };

    // ─── 2) vendor summary ───────────────────────────────────────────
    let outcome = run_vendor_summary(store);
    info!(?outcome, "vendor summary finished");
    (report, outcome)
}
