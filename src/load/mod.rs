//! Bulk loading of tabular chunks into destination tables.
//!
//! Every table write in the crate goes through [`bulk_load`]: the first chunk
//! recreates the table, later chunks append to it. Running the same load twice
//! therefore leaves the table with exactly one copy of the source rows.

use anyhow::{bail, Context, Result};
use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};
use tracing::debug;

pub mod csv;
pub mod scan;

pub use self::csv::ingest_csv;
pub use self::scan::{load_raw_data, table_name_for, ScanOptions, ScanReport};

/// Destination for chunked table writes.
pub trait TableSink {
    /// Drop `table` if it exists and create it empty with `schema`'s columns.
    fn create_or_replace(&mut self, table: &str, schema: &SchemaRef) -> Result<()>;

    /// Append every row of `chunk` to `table`, returning the rows written.
    fn append(&mut self, table: &str, chunk: &RecordBatch) -> Result<usize>;
}

/// Read side of the database: run a query and collect the result.
pub trait TableSource {
    fn query(&mut self, sql: &str) -> Result<(SchemaRef, Vec<RecordBatch>)>;
}

/// Write `chunks` to `table` in order. The first chunk replaces the table,
/// the rest append with the first chunk's columns enforced. A source with no
/// chunks still leaves an empty table built from `schema`.
pub fn bulk_load<S, I>(sink: &mut S, table: &str, schema: &SchemaRef, chunks: I) -> Result<u64>
where
    S: TableSink + ?Sized,
    I: IntoIterator<Item = Result<RecordBatch>>,
{
    let mut first: Option<SchemaRef> = None;
    let mut total: u64 = 0;

    for (idx, chunk) in chunks.into_iter().enumerate() {
        let chunk = chunk.with_context(|| format!("reading chunk {} for {}", idx, table))?;

        match &first {
            None => {
                sink.create_or_replace(table, &chunk.schema())
                    .with_context(|| format!("replacing table {}", table))?;
                first = Some(chunk.schema());
            }
            Some(expected) => {
                if !same_columns(expected, &chunk.schema()) {
                    bail!(
                        "chunk {} for {} does not match the first chunk's columns",
                        idx,
                        table
                    );
                }
            }
        }

        let written = sink
            .append(table, &chunk)
            .with_context(|| format!("appending chunk {} to {}", idx, table))?;
        total += written as u64;
        debug!(table = %table, chunk = idx, rows = written, total, "wrote chunk");
    }

    if first.is_none() {
        sink.create_or_replace(table, schema)
            .with_context(|| format!("creating empty table {}", table))?;
        debug!(table = %table, "source had no rows, created empty table");
    }

    Ok(total)
}

/// Names and types must line up; nullability and metadata may differ.
fn same_columns(a: &SchemaRef, b: &SchemaRef) -> bool {
    a.fields().len() == b.fields().len()
        && a
            .fields()
            .iter()
            .zip(b.fields().iter())
            .all(|(x, y)| x.name() == y.name() && x.data_type() == y.data_type())
}
