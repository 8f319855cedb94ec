//! DuckDB-backed table store.

use crate::load::{TableSink, TableSource};
use anyhow::{Context, Result};
use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};
use duckdb::{appender_params_from_iter, params, types::Value, Connection, Row};
use tracing::debug;

pub mod types;

use types::{cell_value, sql_type};

/// Owns the process-wide database connection. Dropping it closes the database.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open a DuckDB database on disk at `path`, creating the file if it doesn't
    /// exist. `:memory:` opens an in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        if path == ":memory:" {
            return Self::open_in_memory();
        }
        let conn =
            Connection::open(path).with_context(|| format!("opening database {:?}", path))?;
        debug!(path, "opened database");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory database")?;
        Ok(Self { conn })
    }

    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .with_context(|| format!("executing {}", truncate(sql)))
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE lower(table_name) = lower(?)",
            params![table],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self
            .conn
            .query_row(&sql, [], |r| r.get(0))
            .with_context(|| format!("counting rows of {}", table))?;
        Ok(count as u64)
    }

    /// Run `sql` and map each row through `f`.
    pub fn collect_rows<T, F>(&self, sql: &str, f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> duckdb::Result<T>,
    {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("preparing {}", truncate(sql)))?;
        let rows = stmt
            .query_map([], f)?
            .collect::<duckdb::Result<Vec<T>>>()?;
        Ok(rows)
    }
}

impl TableSink for DuckStore {
    fn create_or_replace(&mut self, table: &str, schema: &SchemaRef) -> Result<()> {
        let columns = schema
            .fields()
            .iter()
            .map(|f| Ok(format!("{} {}", quote_ident(f.name()), sql_type(f.data_type())?)))
            .collect::<Result<Vec<String>>>()
            .with_context(|| format!("mapping columns of {}", table))?;
        let sql = format!(
            "CREATE OR REPLACE TABLE {} ({});",
            quote_ident(table),
            columns.join(", ")
        );
        self.execute_batch(&sql)
    }

    fn append(&mut self, table: &str, chunk: &RecordBatch) -> Result<usize> {
        let mut appender = self
            .conn
            .appender(table)
            .with_context(|| format!("opening appender on {}", table))?;

        for row in 0..chunk.num_rows() {
            let values = chunk
                .columns()
                .iter()
                .map(|col| cell_value(col, row))
                .collect::<Result<Vec<Value>>>()
                .with_context(|| format!("converting row {}", row))?;
            appender
                .append_row(appender_params_from_iter(values))
                .with_context(|| format!("appending row {} to {}", row, table))?;
        }
        appender
            .flush()
            .with_context(|| format!("flushing appender on {}", table))?;
        Ok(chunk.num_rows())
    }
}

impl TableSource for DuckStore {
    fn query(&mut self, sql: &str) -> Result<(SchemaRef, Vec<RecordBatch>)> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("preparing {}", truncate(sql)))?;
        let arrow = stmt.query_arrow([])?;
        let schema = arrow.get_schema();
        let batches: Vec<RecordBatch> = arrow.collect();
        Ok((schema, batches))
    }
}

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn truncate(sql: &str) -> String {
    let sql = sql.trim();
    match sql.char_indices().nth(200) {
        Some((end, _)) => format!("{}...", &sql[..end]),
        None => sql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::tests::id_val_batch;
    use arrow::{
        array::{ArrayRef, StringArray},
        datatypes::{DataType, Field, Schema},
    };
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn replace_discards_previous_rows() -> Result<()> {
        let mut store = DuckStore::open_in_memory()?;
        let batch = id_val_batch(&[1, 2, 3], &[10, 20, 30]);

        store.create_or_replace("t", &batch.schema())?;
        store.append("t", &batch)?;
        assert_eq!(store.row_count("t")?, 3);

        store.create_or_replace("t", &batch.schema())?;
        assert_eq!(store.row_count("t")?, 0);
        Ok(())
    }

    #[test]
    fn odd_table_and_column_names_are_quoted() -> Result<()> {
        let mut store = DuckStore::open_in_memory()?;
        let schema = Arc::new(Schema::new(vec![Field::new(
            "Vendor \"Name\"",
            DataType::Utf8,
            true,
        )]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(StringArray::from(vec![Some("a"), None])) as ArrayRef],
        )?;

        store.create_or_replace("2017-purchase prices", &schema)?;
        store.append("2017-purchase prices", &batch)?;

        assert!(store.table_exists("2017-purchase prices")?);
        assert_eq!(store.row_count("2017-purchase prices")?, 2);
        Ok(())
    }

    #[test]
    fn query_reports_schema_for_empty_results() -> Result<()> {
        let mut store = DuckStore::open_in_memory()?;
        store.execute_batch("CREATE TABLE t (id BIGINT, name VARCHAR);")?;

        let (schema, batches) = store.query("SELECT id, name FROM t")?;

        assert_eq!(schema.fields().len(), 2);
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 0);
        Ok(())
    }

    #[test]
    fn disk_database_persists_between_opens() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("inventory.duckdb");
        let path = path.to_str().context("utf-8 temp path")?;
        {
            let mut store = DuckStore::open(path)?;
            let batch = id_val_batch(&[1], &[10]);
            store.create_or_replace("t", &batch.schema())?;
            store.append("t", &batch)?;
        }
        let store = DuckStore::open(path)?;
        assert_eq!(store.row_count("t")?, 1);
        Ok(())
    }

    #[test]
    fn long_sql_is_truncated_in_errors() {
        let long = "x".repeat(500);
        assert_eq!(truncate(&long).len(), 203);
        assert_eq!(truncate("SELECT 1"), "SELECT 1");
    }
}
