//! # Logical Schema
//!
//! User-facing field tree: primitive leaves ([`DataField`]) and the list,
//! struct and map containers. Each field's path is the chain of physical
//! element names leading to it, so container fields contribute the synthetic
//! names of their repeated groups (`list` and `key_value` by default).
//!
//! Paths are assigned by [`Schema::new`]. Top-level leaves have a path equal
//! to their name from construction, so they can be used directly with row
//! group readers and writers; nested leaves should be taken from
//! [`Schema::data_fields`].

use std::collections::HashSet;
use std::fmt;

use crate::constants::{LIST_CONTAINER_NAME, MAP_KEY_VALUE_NAME};
use crate::utils::join_path;

/// Logical value type of a leaf field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    /// UTF-8 text.
    String,
    /// Arbitrary bytes.
    Binary,
    /// Bytes of a fixed width.
    FixedLenBinary(usize),
    /// Days since the Unix epoch.
    Date,
    /// Milliseconds since the Unix epoch.
    TimestampMillis,
    /// Microseconds since the Unix epoch.
    TimestampMicros,
    /// Unscaled integer with decimal precision and scale.
    Decimal { precision: u8, scale: i8 },
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::FixedLenBinary(n) => write!(f, "FixedLenBinary({n})"),
            DataType::Decimal { precision, scale } => write!(f, "Decimal({precision}, {scale})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A primitive leaf column.
#[derive(Debug, Clone, PartialEq)]
pub struct DataField {
    pub name: String,
    pub data_type: DataType,
    /// Whether values may be null (OPTIONAL).
    pub nullable: bool,
    /// Legacy repeated primitive (REPEATED leaf outside a LIST group).
    pub repeated: bool,
    path: Vec<String>,
}

impl DataField {
    /// A required field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            path: vec![name.clone()],
            name,
            data_type,
            nullable: false,
            repeated: false,
        }
    }

    /// A nullable field.
    pub fn optional(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type).with_nullable(true)
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Mark as a legacy repeated primitive.
    pub fn with_repeated(mut self, repeated: bool) -> Self {
        self.repeated = repeated;
        self
    }

    /// Physical path segments, root excluded.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Dot-joined path, as used to key column chunks.
    pub fn path_string(&self) -> String {
        join_path(&self.path)
    }
}

/// A list of `item` values.
#[derive(Debug, Clone, PartialEq)]
pub struct ListField {
    pub name: String,
    pub nullable: bool,
    pub item: Box<Field>,
    container: String,
    path: Vec<String>,
}

impl ListField {
    /// Nullable list. The item's name becomes the physical element name
    /// (conventionally `element`).
    pub fn new(name: impl Into<String>, item: impl Into<Field>) -> Self {
        let name = name.into();
        Self {
            path: vec![name.clone()],
            name,
            nullable: true,
            item: Box::new(item.into()),
            container: LIST_CONTAINER_NAME.to_string(),
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Name of the repeated group between the list and its item.
    pub fn container_name(&self) -> &str {
        &self.container
    }

    pub(crate) fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container = name.into();
        self
    }
}

/// A group of named child fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub nullable: bool,
    pub fields: Vec<Field>,
    path: Vec<String>,
}

impl StructField {
    /// A required struct.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        let name = name.into();
        Self {
            path: vec![name.clone()],
            name,
            nullable: false,
            fields,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Key/value pairs; keys are required.
#[derive(Debug, Clone, PartialEq)]
pub struct MapField {
    pub name: String,
    pub nullable: bool,
    pub key: Box<Field>,
    pub value: Box<Field>,
    container: String,
    path: Vec<String>,
}

impl MapField {
    /// Nullable map. `key` and `value` names become the physical element names.
    pub fn new(name: impl Into<String>, key: impl Into<Field>, value: impl Into<Field>) -> Self {
        let name = name.into();
        Self {
            path: vec![name.clone()],
            name,
            nullable: true,
            key: Box::new(key.into()),
            value: Box::new(value.into()),
            container: MAP_KEY_VALUE_NAME.to_string(),
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Name of the repeated group holding the key and value.
    pub fn container_name(&self) -> &str {
        &self.container
    }

    pub(crate) fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container = name.into();
        self
    }
}

/// Any node of the logical schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Data(DataField),
    List(ListField),
    Struct(StructField),
    Map(MapField),
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Data(f) => &f.name,
            Field::List(f) => &f.name,
            Field::Struct(f) => &f.name,
            Field::Map(f) => &f.name,
        }
    }

    pub fn path(&self) -> &[String] {
        match self {
            Field::Data(f) => &f.path,
            Field::List(f) => &f.path,
            Field::Struct(f) => &f.path,
            Field::Map(f) => &f.path,
        }
    }

    pub fn path_string(&self) -> String {
        join_path(self.path())
    }

    /// Recompute this field's path and its descendants' under `parent`.
    pub(crate) fn assign_paths(&mut self, parent: &[String]) {
        let mut path = parent.to_vec();
        path.push(self.name().to_string());
        match self {
            Field::Data(f) => f.path = path,
            Field::List(f) => {
                let mut inner = path.clone();
                inner.push(f.container.clone());
                f.item.assign_paths(&inner);
                f.path = path;
            }
            Field::Struct(f) => {
                for child in &mut f.fields {
                    child.assign_paths(&path);
                }
                f.path = path;
            }
            Field::Map(f) => {
                let mut inner = path.clone();
                inner.push(f.container.clone());
                f.key.assign_paths(&inner);
                f.value.assign_paths(&inner);
                f.path = path;
            }
        }
    }

    /// Leaf fields under this node, in physical order.
    pub(crate) fn collect_data_fields(&self, out: &mut Vec<DataField>) {
        match self {
            Field::Data(f) => out.push(f.clone()),
            Field::List(f) => f.item.collect_data_fields(out),
            Field::Struct(f) => f.fields.iter().for_each(|c| c.collect_data_fields(out)),
            Field::Map(f) => {
                f.key.collect_data_fields(out);
                f.value.collect_data_fields(out);
            }
        }
    }
}

impl From<DataField> for Field {
    fn from(f: DataField) -> Self {
        Field::Data(f)
    }
}

impl From<ListField> for Field {
    fn from(f: ListField) -> Self {
        Field::List(f)
    }
}

impl From<StructField> for Field {
    fn from(f: StructField) -> Self {
        Field::Struct(f)
    }
}

impl From<MapField> for Field {
    fn from(f: MapField) -> Self {
        Field::Map(f)
    }
}

/// Ordered top-level fields of a file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Field>,
    {
        let mut fields: Vec<Field> = fields.into_iter().map(Into::into).collect();
        for f in &mut fields {
            f.assign_paths(&[]);
        }
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Top-level field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Every leaf, in the order columns must be written.
    pub fn data_fields(&self) -> Vec<DataField> {
        let mut out = Vec::new();
        for f in &self.fields {
            f.collect_data_fields(&mut out);
        }
        out
    }

    /// The first leaf path that occurs more than once, if any.
    pub fn duplicate_path(&self) -> Option<String> {
        let mut seen = HashSet::new();
        self.data_fields()
            .into_iter()
            .map(|f| f.path_string())
            .find(|p| !seen.insert(p.clone()))
    }

    /// Leaf by dot-joined path.
    pub fn data_field(&self, path: &str) -> Option<DataField> {
        self.data_fields().into_iter().find(|f| f.path_string() == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cities_schema() -> Schema {
        Schema::new(vec![
            Field::from(DataField::new("id", DataType::Int32)),
            ListField::new(
                "cities",
                StructField::new(
                    "element",
                    vec![
                        DataField::optional("name", DataType::String).into(),
                        DataField::optional("country", DataType::String).into(),
                    ],
                ),
            )
            .into(),
        ])
    }

    #[test]
    fn top_level_leaf_path_is_its_name() {
        let f = DataField::new("id", DataType::Int32);
        assert_eq!(f.path_string(), "id");
    }

    #[test]
    fn nested_paths_include_synthetic_groups() {
        let paths: Vec<String> = cities_schema()
            .data_fields()
            .iter()
            .map(|f| f.path_string())
            .collect();
        assert_eq!(
            paths,
            vec!["id", "cities.list.element.name", "cities.list.element.country"]
        );
    }

    #[test]
    fn duplicate_paths_are_detected_inside_structs() {
        assert_eq!(cities_schema().duplicate_path(), None);
        let schema = Schema::new(vec![StructField::new(
            "point",
            vec![
                DataField::new("x", DataType::Int32).into(),
                DataField::optional("x", DataType::Int64).into(),
            ],
        )]);
        assert_eq!(schema.duplicate_path().as_deref(), Some("point.x"));
    }

    #[test]
    fn map_paths_go_through_key_value() {
        let schema = Schema::new(vec![MapField::new(
            "tags",
            DataField::new("key", DataType::String),
            DataField::optional("value", DataType::Int64),
        )]);
        let leaf = schema.data_field("tags.key_value.value").unwrap();
        assert_eq!(leaf.data_type, DataType::Int64);
    }
}
