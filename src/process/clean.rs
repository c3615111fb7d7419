use crate::error::{CleaningError, Result};
use crate::process::{
    convert::normalize_dates,
    filter::{filter_by_range, PriceRange},
};
use arrow::{
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_PRICE_COLUMN: &str = "price";
pub const DEFAULT_DATE_COLUMN: &str = "last_review";

/// Inputs to `clean` besides the dataset itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanParams {
    pub price_column: String,
    pub date_column: String,
    pub min_price: f64,
    pub max_price: f64,
}

impl CleanParams {
    pub fn new(min_price: f64, max_price: f64) -> Self {
        Self {
            price_column: DEFAULT_PRICE_COLUMN.to_string(),
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            min_price,
            max_price,
        }
    }

    pub fn range(&self) -> Result<PriceRange> {
        PriceRange::new(self.min_price, self.max_price)
    }
}

fn column_index(batch: &RecordBatch, name: &str) -> Result<usize> {
    batch
        .schema()
        .index_of(name)
        .map_err(|_| CleaningError::Schema(format!("required column `{}` is missing", name)))
}

/// Drop out-of-range prices and retype the date column.
///
/// Only rows with a numeric price inside `[min_price, max_price]` survive, in
/// their original order. The date column is reparsed with unparseable values
/// becoming null; every other column passes through untouched.
pub fn clean(batch: &RecordBatch, params: &CleanParams) -> Result<RecordBatch> {
    let range = params.range()?;
    let price_idx = column_index(batch, &params.price_column)?;
    let date_idx = column_index(batch, &params.date_column)?;

    let filtered = filter_by_range(batch, price_idx, &range)?;
    info!(
        rows_in = batch.num_rows(),
        rows_out = filtered.num_rows(),
        "dropped outliers"
    );

    let dates = normalize_dates(filtered.column(date_idx))?;

    let schema = filtered.schema();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| {
            if i == date_idx {
                f.as_ref().clone().with_data_type(dates.data_type().clone())
            } else {
                f.as_ref().clone()
            }
        })
        .collect();
    let mut columns = filtered.columns().to_vec();
    columns[date_idx] = dates;

    RecordBatch::try_new(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        columns,
    )
    .map_err(|e| CleaningError::Schema(format!("rebuilding cleaned batch: {}", e)))
}
