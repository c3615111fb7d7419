use crate::error::{CleaningError, Result};
use crate::process::{
    convert::build_column,
    schema::{build_schema, infer_column_type},
    utils::cell_to_option,
};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use csv::ReaderBuilder;
use std::{collections::HashSet, fs, io::Read, path::Path, sync::Arc};
use tracing::debug;

/// Headers and raw cells of a CSV input, column-major.
struct RawTable {
    headers: Vec<String>,
    columns: Vec<Vec<Option<String>>>,
}

impl RawTable {
    fn read<R: Read>(input: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(input);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| CleaningError::Parse(format!("reading header row: {}", e)))?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                // Excel-style exports carry a BOM on the first header
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();
        validate_headers(&headers)?;

        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for (idx, result) in rdr.records().enumerate() {
            let record =
                result.map_err(|e| CleaningError::Parse(format!("record {}: {}", idx + 1, e)))?;
            for (col, field) in columns.iter_mut().zip(record.iter()) {
                col.push(cell_to_option(field).map(str::to_string));
            }
        }
        Ok(Self { headers, columns })
    }

    fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    fn into_batch(self, schema: SchemaRef) -> Result<RecordBatch> {
        let num_rows = self.num_rows();
        let arrays = self
            .columns
            .iter()
            .zip(schema.fields())
            .map(|(cells, field)| build_column(field.name(), cells, field.data_type()))
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = num_rows, columns = self.headers.len(), "deserialized csv");

        let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
        RecordBatch::try_new_with_options(schema, arrays, &options)
            .map_err(|e| CleaningError::Parse(format!("assembling record batch: {}", e)))
    }
}

/// Parse CSV (header row, comma separated) into a typed `RecordBatch`.
///
/// Empty cells become nulls and each column is typed by
/// `schema::infer_column_type`.
pub fn deserialize<R: Read>(input: R) -> Result<RecordBatch> {
    let table = RawTable::read(input)?;
    let types: Vec<_> = table
        .columns
        .iter()
        .map(|cells| infer_column_type(cells.iter().map(Option::as_deref)))
        .collect();
    let schema = Arc::new(build_schema(&table.headers, types));
    table.into_batch(schema)
}

/// Parse CSV into a batch with a known schema instead of inferring one.
///
/// The header row must name the schema's fields in order. This is the inverse
/// of `writer::serialize` for any batch it accepts, including columns that are
/// empty, all null, or text that looks numeric.
pub fn deserialize_with_schema<R: Read>(input: R, schema: &Schema) -> Result<RecordBatch> {
    let table = RawTable::read(input)?;
    let expected: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    if table.headers != expected {
        return Err(CleaningError::Schema(format!(
            "header {:?} does not match expected columns {:?}",
            table.headers, expected
        )));
    }
    table.into_batch(Arc::new(schema.clone()))
}

/// Read and parse a CSV file from disk.
pub fn read_csv_file(path: &Path) -> Result<RecordBatch> {
    let file = fs::File::open(path).map_err(|e| {
        CleaningError::Parse(format!("opening {}: {}", path.display(), e))
    })?;
    deserialize(std::io::BufReader::new(file))
}

fn validate_headers(headers: &[String]) -> Result<()> {
    if headers.is_empty() {
        return Err(CleaningError::Parse("input has no header row".into()));
    }
    let mut seen = HashSet::with_capacity(headers.len());
    for (i, h) in headers.iter().enumerate() {
        if h.trim().is_empty() {
            return Err(CleaningError::Parse(format!("header {} is empty", i + 1)));
        }
        if !seen.insert(h.as_str()) {
            return Err(CleaningError::Parse(format!("duplicate column `{}`", h)));
        }
    }
    Ok(())
}
