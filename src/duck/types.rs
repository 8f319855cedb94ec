use anyhow::{bail, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray},
    datatypes::{
        DataType, Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
        Int8Type, UInt16Type, UInt32Type, UInt8Type,
    },
};
use duckdb::types::Value;

/// DuckDB column type for an Arrow column type.
pub fn sql_type(dt: &DataType) -> Result<&'static str> {
    Ok(match dt {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => "BIGINT",
        DataType::Float32 | DataType::Float64 => "DOUBLE",
        DataType::Boolean => "BOOLEAN",
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "VARCHAR",
        DataType::Date32 => "DATE",
        other => bail!("unsupported column type {:?}", other),
    })
}

/// One cell of `col` as a DuckDB value, widened to match [`sql_type`].
pub fn cell_value(col: &ArrayRef, row: usize) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    Ok(match col.data_type() {
        DataType::Int8 => Value::BigInt(col.as_primitive::<Int8Type>().value(row) as i64),
        DataType::Int16 => Value::BigInt(col.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => Value::BigInt(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Value::BigInt(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::BigInt(col.as_primitive::<UInt8Type>().value(row) as i64),
        DataType::UInt16 => Value::BigInt(col.as_primitive::<UInt16Type>().value(row) as i64),
        DataType::UInt32 => Value::BigInt(col.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::Float32 => Value::Double(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::Double(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Boolean(col.as_boolean().value(row)),
        DataType::Utf8 => Value::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => Value::Text(col.as_string_view().value(row).to_string()),
        DataType::Date32 => Value::Date32(col.as_primitive::<Date32Type>().value(row)),
        other => bail!("unsupported column type {:?}", other),
    })
}
