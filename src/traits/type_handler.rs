use std::fmt::Debug;

use crate::error::{ParquetError, Result};
use crate::models::handlers::TypeRegistry;
use crate::models::types::column::ColumnValues;
use crate::models::types::metadata::SchemaElement;
use crate::models::types::parquet::{ConvertedType, PhysicalType};
use crate::models::types::schema::Field;
use crate::options::ParquetOptions;

/// Lookup key for a schema element: physical type (`None` for groups) plus
/// the converted-type annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSignature {
    pub physical: Option<PhysicalType>,
    pub converted: Option<ConvertedType>,
}

impl TypeSignature {
    pub const fn leaf(physical: PhysicalType, converted: Option<ConvertedType>) -> Self {
        Self {
            physical: Some(physical),
            converted,
        }
    }

    pub const fn group(converted: Option<ConvertedType>) -> Self {
        Self {
            physical: None,
            converted,
        }
    }

    pub fn of(element: &SchemaElement) -> Self {
        Self {
            physical: element.physical_type,
            converted: element.converted_type,
        }
    }
}

/// Encode/decode strategy for one family of schema elements.
///
/// Leaf handlers implement `encode`/`decode`; container handlers only
/// translate between the flat element list and the logical field tree.
pub trait TypeHandler: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Element signatures this handler claims in the registry.
    fn signatures(&self) -> Vec<TypeSignature>;

    /// Whether this handler writes `field`.
    fn handles_field(&self, field: &Field) -> bool;

    /// Elements consumed starting at `index`, and how many logical children
    /// follow them in pre-order.
    fn span(&self, _elements: &[SchemaElement], _index: usize) -> Result<(usize, usize)> {
        Ok((1, 0))
    }

    /// Build the logical field for the element at `index` from its already
    /// converted children.
    fn describe_as_logical_field(
        &self,
        elements: &[SchemaElement],
        index: usize,
        children: Vec<Field>,
        options: &ParquetOptions,
    ) -> Result<Field>;

    /// Append the pre-order physical elements for `field`.
    fn describe_as_physical_elements(
        &self,
        field: &Field,
        registry: &TypeRegistry,
        out: &mut Vec<SchemaElement>,
    ) -> Result<()>;

    /// Plain-encode present values for `element`, appending to `out`.
    fn encode(&self, _values: &ColumnValues, element: &SchemaElement, _out: &mut Vec<u8>) -> Result<()> {
        Err(ParquetError::Internal(format!(
            "{} cannot encode values for '{}'",
            self.name(),
            element.name
        )))
    }

    /// Decode `count` plain-encoded values for `element`.
    fn decode(
        &self,
        _buf: &[u8],
        _count: usize,
        element: &SchemaElement,
        _options: &ParquetOptions,
    ) -> Result<ColumnValues> {
        Err(ParquetError::Internal(format!(
            "{} cannot decode values for '{}'",
            self.name(),
            element.name
        )))
    }
}
