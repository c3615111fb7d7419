use crate::error::{CleaningError, Result};
use crate::process::utils::{format_date, format_datetime, format_f64};
use arrow::{
    array::{
        Array, ArrayRef, Date32Array, Float64Array, Int64Array, StringArray,
        TimestampMillisecondArray,
    },
    datatypes::{DataType, TimeUnit},
    record_batch::RecordBatch,
};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::{fs::File, io::Write, path::Path};
use tracing::debug;

/// Per-column cell renderer; null cells render as an empty field.
enum ColumnView<'a> {
    Int(&'a Int64Array),
    Float(&'a Float64Array),
    Text(&'a StringArray),
    Date(&'a Date32Array),
    Timestamp(&'a TimestampMillisecondArray),
}

impl<'a> ColumnView<'a> {
    fn new(name: &str, array: &'a ArrayRef) -> Result<Self> {
        let any = array.as_any();
        let view = match array.data_type() {
            DataType::Int64 => any.downcast_ref::<Int64Array>().map(ColumnView::Int),
            DataType::Float64 => any.downcast_ref::<Float64Array>().map(ColumnView::Float),
            DataType::Utf8 => any.downcast_ref::<StringArray>().map(ColumnView::Text),
            DataType::Date32 => any.downcast_ref::<Date32Array>().map(ColumnView::Date),
            DataType::Timestamp(TimeUnit::Millisecond, None) => any
                .downcast_ref::<TimestampMillisecondArray>()
                .map(ColumnView::Timestamp),
            _ => None,
        };
        view.ok_or_else(|| {
            CleaningError::Schema(format!(
                "column `{}` has type {} which cannot be written as CSV",
                name,
                array.data_type()
            ))
        })
    }

    fn render(&self, row: usize) -> String {
        match self {
            ColumnView::Int(a) if a.is_valid(row) => a.value(row).to_string(),
            ColumnView::Float(a) if a.is_valid(row) => format_f64(a.value(row)),
            ColumnView::Text(a) if a.is_valid(row) => a.value(row).to_string(),
            ColumnView::Date(a) if a.is_valid(row) => {
                a.value_as_date(row).map(format_date).unwrap_or_default()
            }
            ColumnView::Timestamp(a) if a.is_valid(row) => a
                .value_as_datetime(row)
                .map(format_datetime)
                .unwrap_or_default(),
            _ => String::new(),
        }
    }
}

/// Write `batch` as CSV: header row, no index column, `\n` terminated,
/// fields quoted only when they need it.
pub fn serialize<W: Write>(batch: &RecordBatch, out: W) -> Result<()> {
    let schema = batch.schema();
    let views = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, array)| ColumnView::new(field.name(), array))
        .collect::<Result<Vec<_>>>()?;

    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);

    let csv_err = |e: csv::Error| CleaningError::Io(std::io::Error::other(e));

    wtr.write_record(schema.fields().iter().map(|f| f.name().as_str()))
        .map_err(csv_err)?;
    let mut row_buf: Vec<String> = Vec::with_capacity(views.len());
    for row in 0..batch.num_rows() {
        row_buf.clear();
        row_buf.extend(views.iter().map(|v| v.render(row)));
        wtr.write_record(&row_buf).map_err(csv_err)?;
    }
    wtr.flush()?;

    debug!(rows = batch.num_rows(), "serialized csv");
    Ok(())
}

pub fn serialize_to_vec(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    serialize(batch, &mut buf)?;
    Ok(buf)
}

/// Write `batch` to a new file at `path`.
pub fn write_csv_file(batch: &RecordBatch, path: &Path) -> Result<u64> {
    let file = File::create(path)?;
    let mut out = std::io::BufWriter::new(file);
    serialize(batch, &mut out)?;
    out.flush()?;
    Ok(std::fs::metadata(path)?.len())
}
