//! Per-vendor purchase/sales summary built from the loaded base tables.

use crate::load::{bulk_load, TableSink, TableSource};
use anyhow::{Context, Result};
use arrow::{compute::concat_batches, record_batch::RecordBatch};
use std::{iter, time::Instant};
use tracing::{debug, error, info, warn};

pub mod clean;
pub mod metrics;

pub use clean::clean_data;
pub use metrics::add_derived_metrics;

/// Destination of the summary.
pub const SUMMARY_TABLE: &str = "vendor_sales_summary";

/// Freight per vendor, purchases per (vendor, brand) at a positive price, and
/// sales per (vendor, brand), left-joined onto the purchases so every
/// purchased brand shows up. Ranked by purchase dollars.
pub const VENDOR_SUMMARY_QUERY: &str = r#"
WITH FreightSummary AS (
    SELECT VendorNumber, SUM(Freight) AS FreightCost
    FROM vendor_invoice
    GROUP BY VendorNumber
),
PurchaseSummary AS (
    SELECT
        p.VendorNumber,
        p.VendorName,
        p.Brand,
        p.Description,
        p.PurchasePrice,
        pp.Volume,
        pp.Price AS ActualPrice,
        SUM(p.Quantity) AS TotalPurchaseQuantity,
        SUM(p.Dollars) AS TotalPurchaseDollars
    FROM purchases p
    JOIN purchase_prices pp ON p.Brand = pp.Brand
    WHERE p.PurchasePrice > 0
    GROUP BY p.VendorNumber, p.VendorName, p.Brand, p.Description,
             p.PurchasePrice, pp.Volume, pp.Price
),
SalesSummary AS (
    SELECT
        VendorNo,
        Brand,
        SUM(SalesQuantity) AS TotalSalesQuantity,
        SUM(SalesDollars) AS TotalSalesDollars,
        SUM(SalesPrice) AS TotalSalesPrice,
        SUM(ExciseTax) AS TotalExciseTax
    FROM sales
    GROUP BY VendorNo, Brand
)
SELECT
    ps.VendorNumber,
    ps.VendorName,
    ps.Brand,
    ps.Description,
    ps.PurchasePrice,
    ps.ActualPrice,
    ps.Volume,
    ps.TotalPurchaseQuantity,
    ps.TotalPurchaseDollars,
    ss.TotalSalesQuantity,
    ss.TotalSalesDollars,
    ss.TotalSalesPrice,
    ss.TotalExciseTax,
    fs.FreightCost
FROM PurchaseSummary ps
LEFT JOIN SalesSummary ss
    ON ps.VendorNumber = ss.VendorNo AND ps.Brand = ss.Brand
LEFT JOIN FreightSummary fs
    ON ps.VendorNumber = fs.VendorNumber
ORDER BY ps.TotalPurchaseDollars DESC
"#;

/// How the summary step ended. The step never propagates errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Written(u64),
    /// Query returned nothing; the existing table was left alone.
    Empty,
    Failed,
}

/// Run the aggregation query and gather the result into a single batch.
pub fn create_vendor_summary<S>(source: &mut S) -> Result<RecordBatch>
where
    S: TableSource + ?Sized,
{
    let (schema, batches) = source
        .query(VENDOR_SUMMARY_QUERY)
        .context("running vendor summary query")?;
    debug!(batches = batches.len(), "vendor summary query returned");
    concat_batches(&schema, &batches).context("combining vendor summary batches")
}

/// Query, clean and enrich. `None` when there is nothing to summarize.
pub fn build_vendor_summary<S>(source: &mut S) -> Result<Option<RecordBatch>>
where
    S: TableSource + ?Sized,
{
    info!("Creating Vendor Summary Table...");
    let raw = create_vendor_summary(source)?;

    info!("Cleaning Data...");
    let cleaned = clean_data(&raw).context("cleaning vendor summary")?;
    if cleaned.num_rows() == 0 {
        return Ok(None);
    }
    let summary = add_derived_metrics(&cleaned).context("computing derived metrics")?;
    Ok(Some(summary))
}

fn write_vendor_summary<S>(store: &mut S) -> Result<Option<u64>>
where
    S: TableSink + TableSource + ?Sized,
{
    let Some(summary) = build_vendor_summary(store)? else {
        warn!("No data to ingest, vendor summary is empty.");
        return Ok(None);
    };

    info!("Ingesting Data...");
    let schema = summary.schema();
    let rows = bulk_load(store, SUMMARY_TABLE, &schema, iter::once(Ok(summary)))
        .with_context(|| format!("writing {}", SUMMARY_TABLE))?;
    Ok(Some(rows))
}

/// Rebuild `vendor_sales_summary`. Failures are logged with their full chain
/// and leave any previous table untouched; the elapsed time is always logged.
pub fn run_vendor_summary<S>(store: &mut S) -> SummaryOutcome
where
    S: TableSink + TableSource + ?Sized,
{
    let start = Instant::now();

    let outcome = match write_vendor_summary(store) {
        Ok(written) => {
            info!("Completed Successfully");
            written.map_or(SummaryOutcome::Empty, SummaryOutcome::Written)
        }
        Err(e) => {
            error!("Error during ingestion: {:?}", e);
            SummaryOutcome::Failed
        }
    };

    info!(
        "Execution Time: {:.2} seconds",
        start.elapsed().as_secs_f64()
    );
    outcome
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::duck::DuckStore;
    use crate::logging::init_test_logging;
    use arrow::{array::AsArray, datatypes::Float64Type};

    const BASE_TABLES: &str = r#"
        CREATE TABLE purchases (
            VendorNumber BIGINT, VendorName VARCHAR, Brand BIGINT, Description VARCHAR,
            PurchasePrice DOUBLE, Quantity BIGINT, Dollars DOUBLE
        );
        CREATE TABLE purchase_prices (Brand BIGINT, Price DOUBLE, Volume VARCHAR);
        CREATE TABLE sales (
            VendorNo BIGINT, Brand BIGINT, SalesQuantity BIGINT,
            SalesDollars DOUBLE, SalesPrice DOUBLE, ExciseTax DOUBLE
        );
        CREATE TABLE vendor_invoice (VendorNumber BIGINT, Freight DOUBLE);
    "#;

    pub(crate) const BASE_ROWS: &str = r#"
        INSERT INTO purchases VALUES
            (1, '  ALTAMAR BRANDS ', 58, 'Gekkeikan Black & Gold Sake', 10.0, 10, 100.0),
            (2, 'DIAGEO', 100, 'Smirnoff 80', 5.0, 20, 90.0),
            (2, 'DIAGEO', 100, 'Smirnoff 80', 5.0, 30, 150.0),
            (2, 'DIAGEO', 200, 'Ciroc', 20.0, 6, 120.0),
            (3, 'ZERO PRICE', 300, 'Free sample', 0.0, 1, 0.0);
        INSERT INTO purchase_prices VALUES
            (58, 12.99, '750'), (100, 7.99, '1750'), (200, 29.99, 'Unknown'), (300, 1.0, '750');
        INSERT INTO sales VALUES
            (2, 100, 40, 319.6, 7.99, 4.2),
            (2, 100, 5, 39.95, 7.99, 0.5),
            (9, 999, 1, 1.0, 1.0, 0.1);
        INSERT INTO vendor_invoice VALUES (2, 50.0), (2, 25.5), (7, 10.0);
    "#;

    pub(crate) fn store_with(rows: &str) -> Result<DuckStore> {
        let store = DuckStore::open_in_memory()?;
        store.execute_batch(BASE_TABLES)?;
        if !rows.trim().is_empty() {
            store.execute_batch(rows)?;
        }
        Ok(store)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summary_columns_and_ranking() -> Result<()> {
        init_test_logging();
        let mut store = store_with(BASE_ROWS)?;

        let summary = build_vendor_summary(&mut store)?.context("expected rows")?;

        let names: Vec<&str> = summary
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "VendorNumber",
                "VendorName",
                "Brand",
                "Description",
                "PurchasePrice",
                "ActualPrice",
                "Volume",
                "TotalPurchaseQuantity",
                "TotalPurchaseDollars",
                "TotalSalesQuantity",
                "TotalSalesDollars",
                "TotalSalesPrice",
                "TotalExciseTax",
                "FreightCost",
                "GrossProfit",
                "ProfitMargin",
                "StockTurnover",
                "SalesToPurchaseRatio",
            ]
        );

        let idx = summary.schema().index_of("TotalPurchaseDollars")?;
        let dollars = summary.column(idx).as_primitive::<Float64Type>();
        assert_eq!(dollars.values().to_vec(), vec![240.0, 120.0, 100.0]);
        Ok(())
    }

    #[test]
    fn every_purchased_pair_appears_once_with_zero_fill() -> Result<()> {
        init_test_logging();
        let mut store = store_with(BASE_ROWS)?;

        assert_eq!(run_vendor_summary(&mut store), SummaryOutcome::Written(3));

        let rows: Vec<(i64, i64, String, f64, f64, f64, f64, f64, f64)> = store.collect_rows(
            "SELECT VendorNumber, Brand, VendorName, Volume, TotalSalesDollars, FreightCost,
                    GrossProfit, ProfitMargin, StockTurnover
             FROM vendor_sales_summary ORDER BY TotalPurchaseDollars DESC",
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                    r.get(5)?,
                    r.get(6)?,
                    r.get(7)?,
                    r.get(8)?,
                ))
            },
        )?;

        let keys: Vec<(i64, i64)> = rows.iter().map(|r| (r.0, r.1)).collect();
        assert_eq!(keys, vec![(2, 100), (2, 200), (1, 58)]);

        // matched sales and freight
        let smirnoff = &rows[0];
        assert!(close(smirnoff.3, 1750.0));
        assert!(close(smirnoff.4, 359.55));
        assert!(close(smirnoff.5, 75.5));
        assert!(close(smirnoff.6, 119.55));
        assert!(close(smirnoff.8, 45.0 / 50.0));

        // freight but no sales; unparseable volume
        let ciroc = &rows[1];
        assert!(close(ciroc.3, 0.0));
        assert!(close(ciroc.4, 0.0));
        assert!(close(ciroc.5, 75.5));
        assert!(close(ciroc.7, -12_000.0));

        // neither sales nor freight: the zero-sales margin quirk
        let sake = &rows[2];
        assert_eq!(sake.2, "ALTAMAR BRANDS");
        assert!(close(sake.4, 0.0));
        assert!(close(sake.5, 0.0));
        assert!(close(sake.6, -100.0));
        assert!(close(sake.7, -10_000.0));
        Ok(())
    }

    #[test]
    fn rerun_replaces_previous_summary() -> Result<()> {
        init_test_logging();
        let mut store = store_with(BASE_ROWS)?;

        run_vendor_summary(&mut store);
        assert_eq!(run_vendor_summary(&mut store), SummaryOutcome::Written(3));
        assert_eq!(store.row_count(SUMMARY_TABLE)?, 3);
        Ok(())
    }

    #[test]
    fn empty_result_skips_the_write() -> Result<()> {
        init_test_logging();
        let mut store = store_with("")?;
        store.execute_batch(
            "CREATE TABLE vendor_sales_summary (VendorNumber BIGINT); \
             INSERT INTO vendor_sales_summary VALUES (42);",
        )?;

        assert_eq!(run_vendor_summary(&mut store), SummaryOutcome::Empty);

        let kept: Vec<i64> =
            store.collect_rows("SELECT VendorNumber FROM vendor_sales_summary", |r| r.get(0))?;
        assert_eq!(kept, vec![42]);
        Ok(())
    }

    #[test]
    fn query_failure_is_contained() -> Result<()> {
        init_test_logging();
        let mut store = DuckStore::open_in_memory()?;
        store.execute_batch(
            "CREATE TABLE vendor_sales_summary (VendorNumber BIGINT); \
             INSERT INTO vendor_sales_summary VALUES (7);",
        )?;

        assert_eq!(run_vendor_summary(&mut store), SummaryOutcome::Failed);
        assert_eq!(store.row_count(SUMMARY_TABLE)?, 1);
        Ok(())
    }
}
