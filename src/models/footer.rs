//! # Footer Model
//!
//! Owns the file descriptor read from (or destined for) the footer, the
//! [`SchemaTree`] built over its physical schema, and the custom key/value
//! metadata. Also converts between the physical element list and the
//! logical [`Schema`].

use std::sync::Arc;

use crate::constants::{PARQUET_FORMAT_VERSION, ROOT_SCHEMA_NAME};
use crate::error::{ParquetError, Result};
use crate::models::handlers::TypeRegistry;
use crate::models::schema_tree::SchemaTree;
use crate::models::types::metadata::{FileMetaData, KeyValue, RowGroupDescriptor, SchemaElement};
use crate::models::types::schema::{Field, Schema};
use crate::options::ParquetOptions;
use crate::traits::metadata_codec::MetadataCodec;

/// Ordered key/value pairs with map-style access.
///
/// `set` removes every existing pair for the key and appends the new one,
/// so an updated key moves to the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomMetadata {
    pairs: Vec<KeyValue>,
}

impl CustomMetadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|kv| kv.key == key)
            .and_then(|kv| kv.value.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|kv| kv.key == key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.pairs.retain(|kv| kv.key != key);
        self.pairs.push(KeyValue {
            key,
            value: Some(value.into()),
        });
    }

    /// Remove `key`, returning its last value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let last = self
            .pairs
            .iter()
            .rposition(|kv| kv.key == key)
            .and_then(|i| self.pairs[i].value.clone());
        self.pairs.retain(|kv| kv.key != key);
        last
    }

    /// Pairs in current list order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|kv| (kv.key.as_str(), kv.value.as_deref().unwrap_or("")))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn to_pairs(&self) -> Vec<KeyValue> {
        self.pairs.clone()
    }
}

impl From<Vec<KeyValue>> for CustomMetadata {
    fn from(pairs: Vec<KeyValue>) -> Self {
        Self { pairs }
    }
}

#[derive(Debug)]
pub struct Footer {
    meta: FileMetaData,
    tree: Arc<SchemaTree>,
    metadata: CustomMetadata,
}

impl Footer {
    /// Wrap a decoded descriptor.
    pub fn from_metadata(mut meta: FileMetaData) -> Result<Self> {
        let tree = Arc::new(SchemaTree::new(meta.schema.clone())?);
        let metadata = CustomMetadata::from(std::mem::take(&mut meta.key_value_metadata));
        Ok(Self { meta, tree, metadata })
    }

    /// A fresh descriptor with no row groups.
    pub fn from_schema(schema: &Schema, options: &ParquetOptions) -> Result<Self> {
        let meta = FileMetaData {
            version: PARQUET_FORMAT_VERSION,
            schema: to_physical_schema(schema, &options.registry)?,
            num_rows: 0,
            row_groups: Vec::new(),
            key_value_metadata: Vec::new(),
            created_by: Some(options.created_by.clone()),
        };
        Self::from_metadata(meta)
    }

    pub fn meta(&self) -> &FileMetaData {
        &self.meta
    }

    pub fn tree(&self) -> &Arc<SchemaTree> {
        &self.tree
    }

    pub fn row_groups(&self) -> &[RowGroupDescriptor] {
        &self.meta.row_groups
    }

    pub fn num_rows(&self) -> i64 {
        self.meta.num_rows
    }

    pub fn metadata(&self) -> &CustomMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut CustomMetadata {
        &mut self.metadata
    }

    pub fn to_logical_schema(&self, options: &ParquetOptions) -> Result<Schema> {
        to_logical_schema(self.tree.elements(), options)
    }

    pub fn add_row_group(&mut self, rg: RowGroupDescriptor) {
        self.meta.row_groups.push(rg);
        self.update();
    }

    /// Roll the total row count up from the row groups.
    pub fn update(&mut self) {
        self.meta.num_rows = self.meta.row_groups.iter().map(|rg| rg.num_rows).sum();
    }

    pub fn serialize(&mut self, codec: &dyn MetadataCodec) -> Result<Vec<u8>> {
        self.update();
        self.meta.key_value_metadata = self.metadata.to_pairs();
        let bytes = codec.encode_file_metadata(&self.meta);
        self.meta.key_value_metadata.clear();
        bytes
    }

    /// Whether `elements` has the same shape as this footer's schema, root name aside.
    pub fn same_schema(&self, elements: &[SchemaElement]) -> bool {
        let mine = self.tree.elements();
        mine.len() == elements.len()
            && mine[0].child_count() == elements[0].child_count()
            && mine[1..].iter().zip(&elements[1..]).all(|(a, b)| a.same_shape(b))
    }
}

/// Logical fields for a physical element list, root excluded.
///
/// # Errors
/// [`ParquetError::HandlerNotFound`] if an element has no matching handler.
pub fn to_logical_schema(elements: &[SchemaElement], options: &ParquetOptions) -> Result<Schema> {
    let root = elements
        .first()
        .ok_or_else(|| ParquetError::Metadata("schema has no root element".into()))?;
    let mut pos = 1;
    let mut fields = Vec::with_capacity(root.child_count());
    for _ in 0..root.child_count() {
        let (field, next) = convert_element(elements, pos, options)?;
        fields.push(field);
        pos = next;
    }
    let schema = Schema::new(fields);
    if let Some(path) = schema.duplicate_path() {
        return Err(ParquetError::DuplicateField(path));
    }
    Ok(schema)
}

fn convert_element(
    elements: &[SchemaElement],
    index: usize,
    options: &ParquetOptions,
) -> Result<(Field, usize)> {
    let el = elements
        .get(index)
        .ok_or_else(|| ParquetError::Metadata(format!("schema ends before element {index}")))?;
    let handler = options.registry.handler_for_element(el, options)?;
    let (consumed, owned) = handler.span(elements, index)?;
    let mut pos = index + consumed;
    let mut children = Vec::with_capacity(owned);
    for _ in 0..owned {
        let (child, next) = convert_element(elements, pos, options)?;
        children.push(child);
        pos = next;
    }
    Ok((handler.describe_as_logical_field(elements, index, children, options)?, pos))
}

/// Physical element list for `schema`, led by a synthetic root.
///
/// # Errors
/// - [`ParquetError::DuplicateField`] if two leaves share a path.
/// - [`ParquetError::HandlerNotFound`] if a field has no matching handler.
pub fn to_physical_schema(schema: &Schema, registry: &TypeRegistry) -> Result<Vec<SchemaElement>> {
    if let Some(path) = schema.duplicate_path() {
        return Err(ParquetError::DuplicateField(path));
    }
    let mut out = vec![SchemaElement {
        name: ROOT_SCHEMA_NAME.to_string(),
        num_children: Some(schema.len() as i32),
        ..Default::default()
    }];
    for field in schema.fields() {
        registry.describe_physical(field, &mut out)?;
    }
    Ok(out)
}
