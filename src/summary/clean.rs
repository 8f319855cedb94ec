use anyhow::{Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray},
    compute::{cast, cast_with_options, CastOptions},
    datatypes::{DataType, Field, Float64Type, Int64Type, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Aggregates forced to doubles; unparseable values become missing.
pub const NUMERIC_COLUMNS: [&str; 7] = [
    "Volume",
    "TotalPurchaseQuantity",
    "TotalPurchaseDollars",
    "TotalSalesQuantity",
    "TotalSalesDollars",
    "TotalSalesPrice",
    "TotalExciseTax",
];

/// Free-text identifiers that get surrounding whitespace removed.
pub const TRIM_COLUMNS: [&str; 2] = ["VendorName", "Description"];

/// Coerce the aggregate columns to Float64, fill every missing value with
/// zero and trim the free-text columns.
pub fn clean_data(batch: &RecordBatch) -> Result<RecordBatch> {
    let lenient = CastOptions {
        safe: true,
        ..Default::default()
    };

    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut columns = Vec::with_capacity(batch.num_columns());

    for (field, col) in batch.schema().fields().iter().zip(batch.columns()) {
        let name = field.name().as_str();

        let col = if NUMERIC_COLUMNS.contains(&name)
            || matches!(col.data_type(), DataType::Decimal128(..) | DataType::Decimal256(..))
        {
            cast_with_options(col, &DataType::Float64, &lenient)
                .with_context(|| format!("coercing {} to numeric", name))?
        } else if TRIM_COLUMNS.contains(&name) {
            cast_with_options(col, &DataType::Utf8, &lenient)
                .with_context(|| format!("casting {} to text", name))?
        } else {
            col.clone()
        };

        let col = fill_missing(&col).with_context(|| format!("filling {}", name))?;
        let col = if TRIM_COLUMNS.contains(&name) {
            trim_strings(&col)
        } else {
            col
        };

        fields.push(Field::new(
            name,
            col.data_type().clone(),
            col.null_count() > 0,
        ));
        columns.push(col);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Into::into)
}

/// Replace nulls with zero of the column's kind: `0` for numbers, `"0"` for
/// text and `false` for booleans. Narrow integers and floats are widened to
/// Int64 and Float64 first, other string encodings become Utf8.
///
/// Dates and any other type keep their nulls. A zero date would be 1970-01-01,
/// which reads as real data.
fn fill_missing(col: &ArrayRef) -> Result<ArrayRef> {
    if col.null_count() == 0 {
        return Ok(col.clone());
    }
    let dt = col.data_type();
    let col = if dt.is_integer() && dt != &DataType::Int64 {
        cast(col, &DataType::Int64)?
    } else if dt.is_floating() && dt != &DataType::Float64 {
        cast(col, &DataType::Float64)?
    } else if matches!(dt, DataType::LargeUtf8 | DataType::Utf8View) {
        cast(col, &DataType::Utf8)?
    } else {
        col.clone()
    };

    let kind = col.data_type().clone();
    Ok(match kind {
        DataType::Float64 => {
            let arr = col.as_primitive::<Float64Type>();
            Arc::new(Float64Array::from_iter_values(
                arr.iter().map(|v| v.unwrap_or(0.0)),
            )) as ArrayRef
        }
        DataType::Int64 => {
            let arr = col.as_primitive::<Int64Type>();
            Arc::new(Int64Array::from_iter_values(arr.iter().map(|v| v.unwrap_or(0)))) as ArrayRef
        }
        DataType::Utf8 => {
            let arr = col.as_string::<i32>();
            Arc::new(
                arr.iter()
                    .map(|v| Some(v.unwrap_or("0")))
                    .collect::<StringArray>(),
            ) as ArrayRef
        }
        DataType::Boolean => {
            let arr = col.as_boolean();
            Arc::new(
                arr.iter()
                    .map(|v| Some(v.unwrap_or(false)))
                    .collect::<BooleanArray>(),
            ) as ArrayRef
        }
        _ => col,
    })
}

fn trim_strings(col: &ArrayRef) -> ArrayRef {
    let arr = col.as_string::<i32>();
    Arc::new(arr.iter().map(|v| v.map(str::trim)).collect::<StringArray>())
}
