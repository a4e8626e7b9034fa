//! Min/max/null-count summaries for pages and column chunks.
//!
//! Bounds are plain-encoded without length prefixes. Byte arrays compare
//! as unsigned bytes; NaN never becomes a bound. Columns whose order is not
//! the physical signed order (unsigned annotations, decimals, INT96) get a
//! null count only.

use crate::models::types::column::ColumnValues;
use crate::models::types::metadata::{SchemaElement, Statistics};
use crate::models::types::parquet::{ConvertedType, PhysicalType};

fn bounds<T, F>(values: &[T], less: F) -> Option<(&T, &T)>
where
    F: Fn(&T, &T) -> bool,
{
    let mut it = values.iter();
    let first = it.next()?;
    Some(it.fold((first, first), |(lo, hi), v| {
        (if less(v, lo) { v } else { lo }, if less(hi, v) { v } else { hi })
    }))
}

fn float_bounds<T: Copy + PartialOrd>(values: &[T], is_nan: impl Fn(T) -> bool) -> Option<(T, T)> {
    let finite: Vec<T> = values.iter().copied().filter(|&v| !is_nan(v)).collect();
    bounds(&finite, |a, b| a < b).map(|(lo, hi)| (*lo, *hi))
}

fn ordered_by_physical(element: &SchemaElement) -> bool {
    !matches!(
        element.converted_type,
        Some(
            ConvertedType::Uint8
                | ConvertedType::Uint16
                | ConvertedType::Uint32
                | ConvertedType::Uint64
                | ConvertedType::Decimal
                | ConvertedType::Interval
        )
    ) && element.physical_type != Some(PhysicalType::Int96)
}

/// Summary of the present (non-null) `values` for `element`.
pub fn compute_statistics(values: &ColumnValues, null_count: usize, element: &SchemaElement) -> Statistics {
    let mut stats = Statistics {
        null_count: Some(null_count as i64),
        ..Default::default()
    };
    if !ordered_by_physical(element) {
        return stats;
    }
    let encoded: Option<(Vec<u8>, Vec<u8>)> = match values {
        ColumnValues::Boolean(v) => {
            bounds(v.as_slice(), |a, b| !a & b).map(|(lo, hi)| (vec![*lo as u8], vec![*hi as u8]))
        }
        ColumnValues::Int32(v) => bounds(v.as_slice(), |a, b| a < b)
            .map(|(lo, hi)| (lo.to_le_bytes().to_vec(), hi.to_le_bytes().to_vec())),
        ColumnValues::Int64(v) => bounds(v.as_slice(), |a, b| a < b)
            .map(|(lo, hi)| (lo.to_le_bytes().to_vec(), hi.to_le_bytes().to_vec())),
        ColumnValues::Float(v) => float_bounds(v.as_slice(), f32::is_nan)
            .map(|(lo, hi)| (lo.to_le_bytes().to_vec(), hi.to_le_bytes().to_vec())),
        ColumnValues::Double(v) => float_bounds(v.as_slice(), f64::is_nan)
            .map(|(lo, hi)| (lo.to_le_bytes().to_vec(), hi.to_le_bytes().to_vec())),
        ColumnValues::Utf8(v) => bounds(v.as_slice(), |a, b| a.as_bytes() < b.as_bytes())
            .map(|(lo, hi)| (lo.as_bytes().to_vec(), hi.as_bytes().to_vec())),
        ColumnValues::ByteArray(v) => bounds(v.as_slice(), |a, b| a < b).map(|(lo, hi)| (lo.clone(), hi.clone())),
        ColumnValues::Decimal(_) => None,
    };
    if let Some((lo, hi)) = encoded {
        stats.min_value = Some(lo);
        stats.max_value = Some(hi);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::parquet::Repetition;

    fn el(p: PhysicalType) -> SchemaElement {
        SchemaElement::leaf("c", p, Repetition::Optional)
    }

    #[test]
    fn int_bounds_and_nulls() {
        let s = compute_statistics(&ColumnValues::from(vec![3i32, -7, 5]), 2, &el(PhysicalType::Int32));
        assert_eq!(s.null_count, Some(2));
        assert_eq!(s.min_value, Some((-7i32).to_le_bytes().to_vec()));
        assert_eq!(s.max_value, Some(5i32.to_le_bytes().to_vec()));
    }

    #[test]
    fn nan_is_skipped() {
        let s = compute_statistics(&ColumnValues::from(vec![f64::NAN, 1.5, -2.0]), 0, &el(PhysicalType::Double));
        assert_eq!(s.min_value, Some((-2.0f64).to_le_bytes().to_vec()));
        assert_eq!(s.max_value, Some(1.5f64.to_le_bytes().to_vec()));

        let only_nan = compute_statistics(&ColumnValues::from(vec![f32::NAN]), 0, &el(PhysicalType::Float));
        assert!(only_nan.min_value.is_none());
    }

    #[test]
    fn strings_compare_bytewise() {
        let s = compute_statistics(&ColumnValues::from(vec!["pear", "Apple", "fig"]), 0, &el(PhysicalType::ByteArray));
        assert_eq!(s.min_value.as_deref(), Some(&b"Apple"[..]));
        assert_eq!(s.max_value.as_deref(), Some(&b"pear"[..]));
    }

    #[test]
    fn unsigned_annotation_gets_null_count_only() {
        let e = el(PhysicalType::Int32).with_converted_type(ConvertedType::Uint32);
        let s = compute_statistics(&ColumnValues::from(vec![1i32, -1]), 0, &e);
        assert_eq!(s.null_count, Some(0));
        assert!(s.max_value.is_none());
    }

    #[test]
    fn all_null_has_no_bounds() {
        let s = compute_statistics(&ColumnValues::from(Vec::<i64>::new()), 4, &el(PhysicalType::Int64));
        assert_eq!(s.null_count, Some(4));
        assert!(s.min_value.is_none());
    }
}
