use crate::error::{CleaningError, Result};
use crate::process::date_parser::{self, parse_iso_date, parse_iso_datetime};
use crate::process::utils::parse_finite_f64;
use arrow::{
    array::{
        Array, ArrayRef, Date32Builder, Float64Builder, Int64Builder, StringArray, StringBuilder,
        TimestampMillisecondBuilder,
    },
    compute::cast,
    datatypes::{DataType, TimeUnit},
};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::sync::Arc;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn date_to_days(d: NaiveDate) -> i32 {
    d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Build a typed Arrow column from raw CSV cells.
///
/// `ty` comes from `schema::infer_column_type`, so every non-null cell is
/// expected to parse; a cell that does not is an error rather than a silent null.
pub fn build_column(name: &str, cells: &[Option<String>], ty: &DataType) -> Result<ArrayRef> {
    let bad_cell = |s: &str| {
        CleaningError::Parse(format!(
            "column `{}`: cell {:?} does not match inferred type {}",
            name, s, ty
        ))
    };

    let array: ArrayRef = match ty {
        DataType::Int64 => {
            let mut b = Int64Builder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Some(s) => b.append_value(s.trim().parse().map_err(|_| bad_cell(s))?),
                    None => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Float64 => {
            let mut b = Float64Builder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Some(s) => b.append_value(parse_finite_f64(s).ok_or_else(|| bad_cell(s))?),
                    None => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Date32 => {
            let mut b = Date32Builder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Some(s) => {
                        let d = parse_iso_date(s.trim()).ok_or_else(|| bad_cell(s))?;
                        b.append_value(date_to_days(d));
                    }
                    None => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Timestamp(TimeUnit::Millisecond, None) => {
            let mut b = TimestampMillisecondBuilder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Some(s) => {
                        let dt = parse_iso_datetime(s.trim()).ok_or_else(|| bad_cell(s))?;
                        b.append_value(dt.and_utc().timestamp_millis());
                    }
                    None => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Utf8 => {
            let mut b = StringBuilder::with_capacity(cells.len(), 0);
            for cell in cells {
                b.append_option(cell.as_deref());
            }
            Arc::new(b.finish())
        }
        other => {
            return Err(CleaningError::Parse(format!(
                "column `{}`: unsupported column type {}",
                name, other
            )))
        }
    };
    Ok(array)
}

fn is_temporal(ty: &DataType) -> bool {
    matches!(
        ty,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _)
    )
}

/// Reinterpret a column as dates.
///
/// Temporal columns are returned as-is. Anything else is read as text and each
/// cell parsed with `date_parser::parse_datetime`; cells that fail become null.
/// The result is Date32 when no parsed value has a time of day, otherwise
/// Timestamp(ms).
pub fn normalize_dates(array: &ArrayRef) -> Result<ArrayRef> {
    if is_temporal(array.data_type()) {
        return Ok(array.clone());
    }

    let text = cast(array, &DataType::Utf8)
        .map_err(|e| CleaningError::Schema(format!("cannot read dates from column: {}", e)))?;
    let sarr = text
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| CleaningError::Schema("date column did not cast to text".into()))?;

    let parsed: Vec<Option<NaiveDateTime>> = sarr
        .iter()
        .map(|opt| opt.and_then(date_parser::parse_datetime))
        .collect();

    let date_only = parsed
        .iter()
        .flatten()
        .all(|dt| dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0);

    if date_only {
        let mut b = Date32Builder::with_capacity(parsed.len());
        for dt in &parsed {
            b.append_option(dt.map(|dt| date_to_days(dt.date())));
        }
        Ok(Arc::new(b.finish()))
    } else {
        let mut b = TimestampMillisecondBuilder::with_capacity(parsed.len());
        for dt in &parsed {
            b.append_option(dt.map(|dt| dt.and_utc().timestamp_millis()));
        }
        Ok(Arc::new(b.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, Int64Array, TimestampMillisecondArray};

    fn text(values: &[Option<&str>]) -> ArrayRef {
        Arc::new(StringArray::from(values.to_vec()))
    }

    #[test]
    fn epoch_day_conversion() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_days(epoch), 0);
        let d = NaiveDate::from_ymd_opt(2019, 5, 21).unwrap();
        assert_eq!(date_to_days(d), 18_037);
    }

    #[test]
    fn sub_millisecond_input_is_truncated() -> Result<()> {
        let cells = vec![Some("2019-05-21 10:00:00.123456".to_string())];
        let col = build_column("ts", &cells, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
        let ts = col
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .unwrap();
        assert_eq!(ts.value(0), 1_558_432_800_123);
        Ok(())
    }

    #[test]
    fn unparseable_dates_become_null() -> Result<()> {
        let out = normalize_dates(&text(&[Some("2019-05-21"), Some("bogus"), None]))?;
        let dates = out.as_any().downcast_ref::<Date32Array>().unwrap();
        assert_eq!(dates.len(), 3);
        assert_eq!(
            dates.value_as_date(0),
            NaiveDate::from_ymd_opt(2019, 5, 21)
        );
        assert!(dates.is_null(1));
        assert!(dates.is_null(2));
        Ok(())
    }

    #[test]
    fn time_of_day_promotes_to_timestamp() -> Result<()> {
        let out = normalize_dates(&text(&[Some("2019-05-21"), Some("2019-05-22 08:00:00")]))?;
        let ts = out
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .unwrap();
        assert_eq!(
            ts.value_as_datetime(1),
            NaiveDate::from_ymd_opt(2019, 5, 22)
                .unwrap()
                .and_hms_opt(8, 0, 0)
        );
        Ok(())
    }

    #[test]
    fn normalization_is_idempotent() -> Result<()> {
        let once = normalize_dates(&text(&[Some("05/21/2019"), Some("nope")]))?;
        let twice = normalize_dates(&once)?;
        assert_eq!(&*once, &*twice);
        Ok(())
    }

    #[test]
    fn compact_integer_dates_are_read_as_text() -> Result<()> {
        let ints: ArrayRef = Arc::new(Int64Array::from(vec![Some(20190521), Some(7), None]));
        let out = normalize_dates(&ints)?;
        let dates = out.as_any().downcast_ref::<Date32Array>().unwrap();
        assert_eq!(
            dates.value_as_date(0),
            NaiveDate::from_ymd_opt(2019, 5, 21)
        );
        assert!(dates.is_null(1));
        assert!(dates.is_null(2));
        Ok(())
    }

    #[test]
    fn build_column_rejects_mismatched_cells() {
        let cells = vec![Some("1".to_string()), Some("x".to_string())];
        assert!(build_column("n", &cells, &DataType::Int64).is_err());
    }
}
