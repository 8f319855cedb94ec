use super::{bulk_load, TableSink};
use anyhow::{bail, Context, Result};
use arrow::{
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema, SchemaRef},
};
use std::{fs::File, io::BufReader, path::Path, sync::Arc};
use tracing::{debug, instrument};

/// Load one CSV into `table`, `chunk_size` rows at a time.
///
/// Column types come from the first `chunk_size` records only. Later rows that
/// don't parse as those types fail the whole file. Rows with fewer fields than
/// the header are kept, their missing trailing fields stored as NULL.
#[instrument(level = "debug", skip_all, fields(table = %table, path = %path.as_ref().display()))]
pub fn ingest_csv<S, P>(path: P, table: &str, sink: &mut S, chunk_size: usize) -> Result<u64>
where
    S: TableSink + ?Sized,
    P: AsRef<Path>,
{
    if chunk_size == 0 {
        bail!("chunk_size must be greater than zero");
    }
    let path = path.as_ref();

    let schema = infer_csv_schema(path, chunk_size)?;
    debug!(table = %table, columns = schema.fields().len(), "inferred schema");

    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_truncated_rows(true)
        .with_batch_size(chunk_size)
        .build(BufReader::new(file))
        .with_context(|| format!("building CSV reader for {:?}", path))?;

    let chunks = reader.map(|res| res.with_context(|| format!("parsing {:?}", path)));
    bulk_load(sink, table, &schema, chunks)
}

/// Infer column types from the header plus the first `max_records` rows.
fn infer_csv_schema(path: &Path, max_records: usize) -> Result<SchemaRef> {
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let (schema, _) = Format::default()
        .with_header(true)
        .with_truncated_rows(true)
        .infer_schema(BufReader::new(file), Some(max_records))
        .with_context(|| format!("inferring schema of {:?}", path))?;

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), storable_type(f.data_type()), true))
        .collect();
    Ok(Arc::new(Schema::new(fields)))
}

/// Narrow inferred types to the ones the sinks store natively; the rest stay text.
fn storable_type(dt: &DataType) -> DataType {
    match dt {
        DataType::Int64 | DataType::Float64 | DataType::Boolean | DataType::Date32 => dt.clone(),
        _ => DataType::Utf8,
    }
}
