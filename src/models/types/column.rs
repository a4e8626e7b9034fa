//! # In-Memory Columns
//!
//! A [`Column`] pairs a leaf [`DataField`] with one value per level slot.
//! Null slots hold a placeholder value and are cleared in the validity
//! [`Bitmask`]. Nested columns additionally carry repetition levels, and
//! may carry explicit definition levels when nulls occur at an ancestor
//! rather than at the leaf.

use minarrow::{Bitmask, Vec64};

use crate::error::{ParquetError, Result};
use crate::models::types::schema::DataField;

/// Typed value buffer of a column.
#[derive(Debug, Clone)]
pub enum ColumnValues {
    Boolean(Vec64<bool>),
    /// Also backs `Date`.
    Int32(Vec64<i32>),
    /// Also backs timestamps.
    Int64(Vec64<i64>),
    Float(Vec64<f32>),
    Double(Vec64<f64>),
    /// Binary and fixed-length binary.
    ByteArray(Vec<Vec<u8>>),
    Utf8(Vec<String>),
    /// Unscaled decimal values.
    Decimal(Vec<i128>),
}

/// Applies `$body` to the inner buffer of every variant, rebuilding the same variant.
macro_rules! map_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            ColumnValues::Boolean($v) => ColumnValues::Boolean($body),
            ColumnValues::Int32($v) => ColumnValues::Int32($body),
            ColumnValues::Int64($v) => ColumnValues::Int64($body),
            ColumnValues::Float($v) => ColumnValues::Float($body),
            ColumnValues::Double($v) => ColumnValues::Double($body),
            ColumnValues::ByteArray($v) => ColumnValues::ByteArray($body),
            ColumnValues::Utf8($v) => ColumnValues::Utf8($body),
            ColumnValues::Decimal($v) => ColumnValues::Decimal($body),
        }
    };
}

fn gather_slice<T: Clone, C: From<Vec<T>>>(src: &[T], indices: &[usize]) -> C {
    indices.iter().map(|&i| src[i].clone()).collect::<Vec<T>>().into()
}

fn scatter_slice<T: Clone + Default, C: From<Vec<T>>>(dense: &[T], present: &[bool]) -> C {
    let mut it = dense.iter();
    present
        .iter()
        .map(|&p| if p { it.next().cloned().unwrap_or_default() } else { T::default() })
        .collect::<Vec<T>>()
        .into()
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Boolean(v) => v.len(),
            ColumnValues::Int32(v) => v.len(),
            ColumnValues::Int64(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Double(v) => v.len(),
            ColumnValues::ByteArray(v) => v.len(),
            ColumnValues::Utf8(v) => v.len(),
            ColumnValues::Decimal(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValues::Boolean(_) => "Boolean",
            ColumnValues::Int32(_) => "Int32",
            ColumnValues::Int64(_) => "Int64",
            ColumnValues::Float(_) => "Float",
            ColumnValues::Double(_) => "Double",
            ColumnValues::ByteArray(_) => "ByteArray",
            ColumnValues::Utf8(_) => "Utf8",
            ColumnValues::Decimal(_) => "Decimal",
        }
    }

    /// An empty buffer of the same variant.
    pub fn empty_like(&self) -> ColumnValues {
        map_values!(self, _v => Vec::new().into())
    }

    /// Values at `indices`, in order. Indices must be in bounds.
    pub fn gather(&self, indices: &[usize]) -> ColumnValues {
        map_values!(self, v => gather_slice(v.as_slice(), indices))
    }

    /// Values in `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> ColumnValues {
        map_values!(self, v => v.as_slice()[start..end].to_vec().into())
    }

    /// Resolve dictionary indices against `self`.
    pub fn take_dictionary(&self, indices: &[u32]) -> Result<ColumnValues> {
        let len = self.len();
        let mut idx = Vec::with_capacity(indices.len());
        for &i in indices {
            let i = i as usize;
            if i >= len {
                return Err(ParquetError::Format(format!(
                    "dictionary index {i} out of range for {len} entries"
                )));
            }
            idx.push(i);
        }
        Ok(self.gather(&idx))
    }

    /// Expand dense values to one entry per slot, filling absent slots with defaults.
    pub fn scatter(&self, present: &[bool]) -> ColumnValues {
        map_values!(self, v => scatter_slice(v.as_slice(), present))
    }

    /// Append `other`, which must be the same variant.
    pub fn append(&mut self, other: ColumnValues) -> Result<()> {
        match (self, other) {
            (ColumnValues::Boolean(a), ColumnValues::Boolean(b)) => a.extend_from_slice(b.as_slice()),
            (ColumnValues::Int32(a), ColumnValues::Int32(b)) => a.extend_from_slice(b.as_slice()),
            (ColumnValues::Int64(a), ColumnValues::Int64(b)) => a.extend_from_slice(b.as_slice()),
            (ColumnValues::Float(a), ColumnValues::Float(b)) => a.extend_from_slice(b.as_slice()),
            (ColumnValues::Double(a), ColumnValues::Double(b)) => a.extend_from_slice(b.as_slice()),
            (ColumnValues::ByteArray(a), ColumnValues::ByteArray(b)) => a.extend(b),
            (ColumnValues::Utf8(a), ColumnValues::Utf8(b)) => a.extend(b),
            (ColumnValues::Decimal(a), ColumnValues::Decimal(b)) => a.extend(b),
            (a, b) => {
                return Err(ParquetError::Internal(format!(
                    "cannot append {} values to {}",
                    b.type_name(),
                    a.type_name()
                )));
            }
        }
        Ok(())
    }

    pub fn as_bool(&self) -> Option<&[bool]> {
        match self {
            ColumnValues::Boolean(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            ColumnValues::Int32(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            ColumnValues::Int64(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            ColumnValues::Float(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            ColumnValues::Double(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[Vec<u8>]> {
        match self {
            ColumnValues::ByteArray(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_utf8(&self) -> Option<&[String]> {
        match self {
            ColumnValues::Utf8(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<&[i128]> {
        match self {
            ColumnValues::Decimal(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

impl PartialEq for ColumnValues {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ColumnValues::Boolean(a), ColumnValues::Boolean(b)) => a.as_slice() == b.as_slice(),
            (ColumnValues::Int32(a), ColumnValues::Int32(b)) => a.as_slice() == b.as_slice(),
            (ColumnValues::Int64(a), ColumnValues::Int64(b)) => a.as_slice() == b.as_slice(),
            (ColumnValues::Float(a), ColumnValues::Float(b)) => a.as_slice() == b.as_slice(),
            (ColumnValues::Double(a), ColumnValues::Double(b)) => a.as_slice() == b.as_slice(),
            (ColumnValues::ByteArray(a), ColumnValues::ByteArray(b)) => a == b,
            (ColumnValues::Utf8(a), ColumnValues::Utf8(b)) => a == b,
            (ColumnValues::Decimal(a), ColumnValues::Decimal(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! impl_from_vec64 {
    ($t:ty, $variant:ident) => {
        impl From<Vec<$t>> for ColumnValues {
            fn from(v: Vec<$t>) -> Self {
                ColumnValues::$variant(Vec64::from(v))
            }
        }

        impl From<Vec64<$t>> for ColumnValues {
            fn from(v: Vec64<$t>) -> Self {
                ColumnValues::$variant(v)
            }
        }
    };
}

impl_from_vec64!(bool, Boolean);
impl_from_vec64!(i32, Int32);
impl_from_vec64!(i64, Int64);
impl_from_vec64!(f32, Float);
impl_from_vec64!(f64, Double);

impl From<Vec<Vec<u8>>> for ColumnValues {
    fn from(v: Vec<Vec<u8>>) -> Self {
        ColumnValues::ByteArray(v)
    }
}

impl From<Vec<String>> for ColumnValues {
    fn from(v: Vec<String>) -> Self {
        ColumnValues::Utf8(v)
    }
}

impl From<Vec<&str>> for ColumnValues {
    fn from(v: Vec<&str>) -> Self {
        ColumnValues::Utf8(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i128>> for ColumnValues {
    fn from(v: Vec<i128>) -> Self {
        ColumnValues::Decimal(v)
    }
}

/// One leaf column's data for a single row group.
#[derive(Debug, Clone)]
pub struct Column {
    field: DataField,
    values: ColumnValues,
    validity: Option<Bitmask>,
    definition_levels: Option<Vec<u32>>,
    repetition_levels: Option<Vec<u32>>,
}

impl Column {
    /// A column without nulls.
    pub fn new(field: DataField, values: impl Into<ColumnValues>) -> Self {
        Self {
            field,
            values: values.into(),
            validity: None,
            definition_levels: None,
            repetition_levels: None,
        }
    }

    /// A column whose slot `i` is null when `validity[i]` is false.
    ///
    /// # Errors
    /// [`ParquetError::InvalidColumn`] if the lengths differ.
    pub fn with_validity(
        field: DataField,
        values: impl Into<ColumnValues>,
        validity: &[bool],
    ) -> Result<Self> {
        let values = values.into();
        if values.len() != validity.len() {
            return Err(ParquetError::InvalidColumn(format!(
                "'{}': {} values but {} validity flags",
                field.path_string(),
                values.len(),
                validity.len()
            )));
        }
        let validity = if validity.iter().all(|&v| v) {
            None
        } else {
            Some(Bitmask::from_bools(validity))
        };
        Ok(Self {
            field,
            values,
            validity,
            definition_levels: None,
            repetition_levels: None,
        })
    }

    /// Build from optional values; `None` becomes a null slot.
    pub fn from_options<T>(field: DataField, values: Vec<Option<T>>) -> Self
    where
        T: Default,
        Vec<T>: Into<ColumnValues>,
    {
        let validity: Vec<bool> = values.iter().map(Option::is_some).collect();
        let dense: Vec<T> = values.into_iter().map(Option::unwrap_or_default).collect();
        let values = dense.into();
        let validity = if validity.iter().all(|&v| v) {
            None
        } else {
            Some(Bitmask::from_bools(&validity))
        };
        Self {
            field,
            values,
            validity,
            definition_levels: None,
            repetition_levels: None,
        }
    }

    /// Attach repetition levels, one per slot.
    pub fn with_repetition_levels(mut self, levels: Vec<u32>) -> Self {
        self.repetition_levels = Some(levels);
        self
    }

    /// Attach explicit definition levels, one per slot. They take precedence
    /// over the validity mask when the column is written.
    pub fn with_definition_levels(mut self, levels: Vec<u32>) -> Self {
        self.definition_levels = Some(levels);
        self
    }

    pub(crate) fn from_parts(
        field: DataField,
        values: ColumnValues,
        validity: Option<Bitmask>,
        definition_levels: Option<Vec<u32>>,
        repetition_levels: Option<Vec<u32>>,
    ) -> Self {
        Self {
            field,
            values,
            validity,
            definition_levels,
            repetition_levels,
        }
    }

    pub fn field(&self) -> &DataField {
        &self.field
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn validity(&self) -> Option<&Bitmask> {
        self.validity.as_ref()
    }

    pub fn definition_levels(&self) -> Option<&[u32]> {
        self.definition_levels.as_deref()
    }

    pub fn repetition_levels(&self) -> Option<&[u32]> {
        self.repetition_levels.as_deref()
    }

    /// Number of level slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_null(&self, i: usize) -> bool {
        self.validity.as_ref().is_some_and(|m| !m.get(i))
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    /// Append the slots of `other`, a column for the same leaf, keeping nulls
    /// and levels aligned with the values.
    ///
    /// # Errors
    /// [`ParquetError::InvalidColumn`] if `other` belongs to another leaf or
    /// carries levels where `self` has none (or the reverse).
    pub fn append(&mut self, mut other: Column) -> Result<()> {
        if other.field.path() != self.field.path() {
            return Err(ParquetError::InvalidColumn(format!(
                "cannot append '{}' to '{}'",
                other.field.path_string(),
                self.field.path_string()
            )));
        }
        let (def, rep) = (
            concat_levels(&self.field, "definition", self.definition_levels.take(), other.definition_levels.take())?,
            concat_levels(&self.field, "repetition", self.repetition_levels.take(), other.repetition_levels.take())?,
        );
        self.definition_levels = def;
        self.repetition_levels = rep;

        let validity = if self.validity.is_some() || other.validity.is_some() {
            let flags: Vec<bool> = (0..self.len())
                .map(|i| !self.is_null(i))
                .chain((0..other.len()).map(|i| !other.is_null(i)))
                .collect();
            Some(Bitmask::from_bools(&flags))
        } else {
            None
        };
        self.values.append(other.values)?;
        self.validity = validity;
        Ok(())
    }

    /// Rows this column spans: slots starting a new record when repetition
    /// levels are present, otherwise one row per slot.
    pub fn row_count(&self) -> usize {
        match &self.repetition_levels {
            Some(r) => r.iter().filter(|&&l| l == 0).count(),
            None => self.len(),
        }
    }

    /// `i32` values with nulls as `None`.
    pub fn i32_options(&self) -> Option<Vec<Option<i32>>> {
        let v = self.values.as_i32()?;
        Some(v.iter().enumerate().map(|(i, x)| (!self.is_null(i)).then_some(*x)).collect())
    }

    /// `i64` values with nulls as `None`.
    pub fn i64_options(&self) -> Option<Vec<Option<i64>>> {
        let v = self.values.as_i64()?;
        Some(v.iter().enumerate().map(|(i, x)| (!self.is_null(i)).then_some(*x)).collect())
    }

    /// String values with nulls as `None`.
    pub fn utf8_options(&self) -> Option<Vec<Option<&str>>> {
        let v = self.values.as_utf8()?;
        Some(
            v.iter()
                .enumerate()
                .map(|(i, x)| (!self.is_null(i)).then_some(x.as_str()))
                .collect(),
        )
    }
}

fn concat_levels(
    field: &DataField,
    kind: &str,
    head: Option<Vec<u32>>,
    tail: Option<Vec<u32>>,
) -> Result<Option<Vec<u32>>> {
    match (head, tail) {
        (None, None) => Ok(None),
        (Some(mut a), Some(b)) => {
            a.extend(b);
            Ok(Some(a))
        }
        _ => Err(ParquetError::InvalidColumn(format!(
            "'{}': only one side carries {kind} levels",
            field.path_string()
        ))),
    }
}
