use crate::error::{CleaningError, Result};
use crate::process::utils::parse_finite_f64;
use arrow::{
    array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray},
    compute::filter_record_batch,
    datatypes::DataType,
    record_batch::RecordBatch,
};

/// Inclusive `[min, max]` bounds over a numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// Both bounds must be finite and `min <= max`.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(CleaningError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }
}

/// Row mask for `column`: true where the value is present, numeric and in range.
///
/// Text columns are parsed cell by cell; anything that is not a finite
/// number is treated like a null and never matches.
pub fn range_mask(column: &ArrayRef, range: &PriceRange) -> Result<BooleanArray> {
    let any = column.as_any();
    let mask: BooleanArray = match column.data_type() {
        DataType::Int64 => {
            let arr = downcast::<Int64Array>(any)?;
            arr.iter()
                .map(|v| Some(v.is_some_and(|v| range.contains(v as f64))))
                .collect()
        }
        DataType::Float64 => {
            let arr = downcast::<Float64Array>(any)?;
            arr.iter()
                .map(|v| Some(v.is_some_and(|v| range.contains(v))))
                .collect()
        }
        DataType::Utf8 => {
            let arr = downcast::<StringArray>(any)?;
            arr.iter()
                .map(|v| {
                    Some(
                        v.and_then(parse_finite_f64)
                            .is_some_and(|v| range.contains(v)),
                    )
                })
                .collect()
        }
        other => {
            return Err(CleaningError::Schema(format!(
                "range filter needs a numeric column, got {}",
                other
            )))
        }
    };
    Ok(mask)
}

fn downcast<T: Array + 'static>(any: &dyn std::any::Any) -> Result<&T> {
    any.downcast_ref::<T>()
        .ok_or_else(|| CleaningError::Schema("column array does not match its type".into()))
}

/// Keep only rows whose `column_index` value lies in `range`. Row order is preserved.
pub fn filter_by_range(
    batch: &RecordBatch,
    column_index: usize,
    range: &PriceRange,
) -> Result<RecordBatch> {
    let mask = range_mask(batch.column(column_index), range)?;
    filter_record_batch(batch, &mask)
        .map_err(|e| CleaningError::Schema(format!("applying range filter: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn mask_values(mask: &BooleanArray) -> Vec<bool> {
        mask.iter().map(|v| v.unwrap_or(false)).collect()
    }

    #[test]
    fn bounds_are_inclusive() -> Result<()> {
        let range = PriceRange::new(10.0, 350.0)?;
        let col: ArrayRef = Arc::new(Int64Array::from(vec![
            Some(9),
            Some(10),
            Some(200),
            Some(350),
            Some(351),
            None,
        ]));
        assert_eq!(
            mask_values(&range_mask(&col, &range)?),
            vec![false, true, true, true, false, false]
        );
        Ok(())
    }

    #[test]
    fn nan_and_text_garbage_never_match() -> Result<()> {
        let range = PriceRange::new(f64::MIN, f64::MAX)?;
        let floats: ArrayRef = Arc::new(Float64Array::from(vec![Some(f64::NAN), Some(1.5)]));
        assert_eq!(mask_values(&range_mask(&floats, &range)?), vec![false, true]);

        let text: ArrayRef = Arc::new(StringArray::from(vec![
            Some("12"),
            Some("$12"),
            None,
            Some(" 7.5 "),
        ]));
        assert_eq!(
            mask_values(&range_mask(&text, &range)?),
            vec![true, false, false, true]
        );
        Ok(())
    }

    #[test]
    fn rejects_inverted_or_non_finite_bounds() {
        assert!(matches!(
            PriceRange::new(500.0, 10.0),
            Err(CleaningError::InvalidRange { .. })
        ));
        assert!(PriceRange::new(f64::NAN, 10.0).is_err());
        assert!(PriceRange::new(0.0, f64::INFINITY).is_err());
        assert!(PriceRange::new(10.0, 10.0).is_ok());
    }

    #[test]
    fn filter_keeps_row_order() -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("price", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])),
                Arc::new(Int64Array::from(vec![100, 5, 300, 90, 1000])),
            ],
        )
        .unwrap();
        let out = filter_by_range(&batch, 1, &PriceRange::new(10.0, 500.0)?)?;
        let ids = out.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(ids.values().to_vec(), vec![1, 3, 4]);
        Ok(())
    }

    #[test]
    fn non_numeric_column_types_are_schema_errors() {
        let col: ArrayRef = Arc::new(arrow::array::Date32Array::from(vec![1]));
        let range = PriceRange::new(0.0, 1.0).unwrap();
        assert!(matches!(
            range_mask(&col, &range),
            Err(CleaningError::Schema(_))
        ));
    }
}
