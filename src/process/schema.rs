use crate::process::date_parser::{parse_iso_date, parse_iso_datetime};
use crate::process::utils::parse_finite_f64;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

/// Type a CSV column can be read back as.
pub fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, None)
}

/// Infer the narrowest column type that every non-null cell parses as.
///
/// Order: Int64, Float64, Date32, Timestamp(ms), Utf8. A column with no
/// non-null cells stays Utf8.
pub fn infer_column_type<'a, I>(cells: I) -> DataType
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut seen_any = false;
    let mut int = true;
    let mut float = true;
    let mut date = true;
    let mut datetime = true;

    for cell in cells.into_iter().flatten() {
        seen_any = true;
        let s = cell.trim();
        if int && s.parse::<i64>().is_err() {
            int = false;
        }
        if float && parse_finite_f64(s).is_none() {
            float = false;
        }
        if date && parse_iso_date(s).is_none() {
            date = false;
        }
        if datetime && parse_iso_datetime(s).is_none() {
            datetime = false;
        }
        if !(int || float || date || datetime) {
            break;
        }
    }

    if !seen_any {
        DataType::Utf8
    } else if int {
        DataType::Int64
    } else if float {
        DataType::Float64
    } else if date {
        DataType::Date32
    } else if datetime {
        timestamp_type()
    } else {
        DataType::Utf8
    }
}

/// Build a nullable schema from header names and inferred types.
pub fn build_schema(headers: &[String], types: Vec<DataType>) -> Schema {
    let fields: Vec<Field> = headers
        .iter()
        .zip(types)
        .map(|(name, ty)| Field::new(name, ty, true))
        .collect();
    Schema::new(fields)
}
