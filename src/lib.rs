//! Batch ETL for vendor inventory data: load a directory of CSVs into DuckDB
//! tables, then derive the `vendor_sales_summary` table from them.

pub mod cli;
pub mod config;
pub mod duck;
pub mod load;
pub mod logging;
pub mod pipeline;
pub mod summary;
