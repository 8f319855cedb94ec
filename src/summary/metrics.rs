use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, AsArray, Float64Array, PrimitiveArray},
    datatypes::{DataType, Field, Float64Type, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Columns appended by [`add_derived_metrics`], in order.
pub const DERIVED_COLUMNS: [&str; 4] = [
    "GrossProfit",
    "ProfitMargin",
    "StockTurnover",
    "SalesToPurchaseRatio",
];

/// A zero denominator is replaced by 1 rather than producing inf/NaN.
///
/// For zero-sales rows this makes ProfitMargin equal GrossProfit * 100, which is
/// not a percentage. Kept as-is for compatibility with existing reports.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        numerator
    } else {
        numerator / denominator
    }
}

fn f64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a PrimitiveArray<Float64Type>> {
    let idx = batch
        .schema()
        .index_of(name)
        .with_context(|| format!("summary has no {} column", name))?;
    batch
        .column(idx)
        .as_primitive_opt::<Float64Type>()
        .with_context(|| format!("{} is not a Float64 column", name))
}

/// Append GrossProfit, ProfitMargin, StockTurnover and SalesToPurchaseRatio,
/// computed over the whole cleaned batch.
pub fn add_derived_metrics(batch: &RecordBatch) -> Result<RecordBatch> {
    let sales_dollars = f64_column(batch, "TotalSalesDollars")?;
    let purchase_dollars = f64_column(batch, "TotalPurchaseDollars")?;
    let sales_qty = f64_column(batch, "TotalSalesQuantity")?;
    let purchase_qty = f64_column(batch, "TotalPurchaseQuantity")?;

    let gross_profit: Float64Array = sales_dollars
        .values()
        .iter()
        .zip(purchase_dollars.values().iter())
        .map(|(s, p)| Some(s - p))
        .collect();
    let profit_margin: Float64Array = gross_profit
        .values()
        .iter()
        .zip(sales_dollars.values().iter())
        .map(|(g, s)| Some(ratio(*g, *s) * 100.0))
        .collect();
    let stock_turnover: Float64Array = sales_qty
        .values()
        .iter()
        .zip(purchase_qty.values().iter())
        .map(|(s, p)| Some(ratio(*s, *p)))
        .collect();
    let sales_to_purchase: Float64Array = sales_dollars
        .values()
        .iter()
        .zip(purchase_dollars.values().iter())
        .map(|(s, p)| Some(ratio(*s, *p)))
        .collect();

    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.extend(
        DERIVED_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, false)),
    );

    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    columns.push(Arc::new(gross_profit));
    columns.push(Arc::new(profit_margin));
    columns.push(Arc::new(stock_turnover));
    columns.push(Arc::new(sales_to_purchase));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Into::into)
}
