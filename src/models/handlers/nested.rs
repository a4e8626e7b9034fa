//! Container handlers. These only translate between the flat element list
//! and the logical field tree; values always live in leaf columns.

use crate::error::{ParquetError, Result};
use crate::models::handlers::TypeRegistry;
use crate::models::types::metadata::SchemaElement;
use crate::models::types::parquet::{ConvertedType, Repetition};
use crate::models::types::schema::{Field, ListField, MapField, StructField};
use crate::options::ParquetOptions;
use crate::traits::type_handler::{TypeHandler, TypeSignature};

fn nullable_repetition(nullable: bool) -> Repetition {
    if nullable { Repetition::Optional } else { Repetition::Required }
}

/// The single repeated group directly under `elements[index]`, if it has `children` children.
fn repeated_child(elements: &[SchemaElement], index: usize, children: usize) -> Option<&SchemaElement> {
    let parent = &elements[index];
    let child = elements.get(index + 1)?;
    (parent.child_count() == 1
        && child.is_group()
        && child.repetition_or_required() == Repetition::Repeated
        && child.child_count() == children)
        .then_some(child)
}

fn expect_children(name: &str, children: Vec<Field>, n: usize) -> Result<Vec<Field>> {
    if children.len() != n {
        return Err(ParquetError::Internal(format!(
            "'{name}' expects {n} child fields, got {}",
            children.len()
        )));
    }
    Ok(children)
}

/// Three-level `LIST` groups: `<name> (LIST) / <repeated group> / <item>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListHandler;

impl TypeHandler for ListHandler {
    fn name(&self) -> &'static str {
        "list"
    }

    fn signatures(&self) -> Vec<TypeSignature> {
        vec![TypeSignature::group(Some(ConvertedType::List))]
    }

    fn handles_field(&self, field: &Field) -> bool {
        matches!(field, Field::List(_))
    }

    fn span(&self, elements: &[SchemaElement], index: usize) -> Result<(usize, usize)> {
        match repeated_child(elements, index, 1) {
            Some(_) => Ok((2, 1)),
            None => Err(ParquetError::Format(format!(
                "LIST '{}' is not a three-level list",
                elements[index].name
            ))),
        }
    }

    fn describe_as_logical_field(
        &self,
        elements: &[SchemaElement],
        index: usize,
        children: Vec<Field>,
        _options: &ParquetOptions,
    ) -> Result<Field> {
        let el = &elements[index];
        let item = expect_children(&el.name, children, 1)?.remove(0);
        Ok(ListField::new(el.name.clone(), item)
            .with_nullable(el.repetition_or_required() == Repetition::Optional)
            .with_container_name(elements[index + 1].name.clone())
            .into())
    }

    fn describe_as_physical_elements(
        &self,
        field: &Field,
        registry: &TypeRegistry,
        out: &mut Vec<SchemaElement>,
    ) -> Result<()> {
        let Field::List(list) = field else {
            return Err(ParquetError::Internal("list handler given a non-list field".into()));
        };
        out.push(
            SchemaElement::group(list.name.clone(), nullable_repetition(list.nullable), 1)
                .with_converted_type(ConvertedType::List),
        );
        out.push(SchemaElement::group(list.container_name(), Repetition::Repeated, 1));
        registry.describe_physical(&list.item, out)
    }
}

/// `MAP` groups: `<name> (MAP) / <repeated key_value> / key, value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapHandler;

impl TypeHandler for MapHandler {
    fn name(&self) -> &'static str {
        "map"
    }

    fn signatures(&self) -> Vec<TypeSignature> {
        vec![
            TypeSignature::group(Some(ConvertedType::Map)),
            TypeSignature::group(Some(ConvertedType::MapKeyValue)),
        ]
    }

    fn handles_field(&self, field: &Field) -> bool {
        matches!(field, Field::Map(_))
    }

    fn span(&self, elements: &[SchemaElement], index: usize) -> Result<(usize, usize)> {
        match repeated_child(elements, index, 2) {
            Some(_) => Ok((2, 2)),
            None => Err(ParquetError::Format(format!(
                "MAP '{}' lacks a repeated key/value group",
                elements[index].name
            ))),
        }
    }

    fn describe_as_logical_field(
        &self,
        elements: &[SchemaElement],
        index: usize,
        children: Vec<Field>,
        _options: &ParquetOptions,
    ) -> Result<Field> {
        let el = &elements[index];
        let mut kv = expect_children(&el.name, children, 2)?;
        let value = kv.remove(1);
        let key = kv.remove(0);
        Ok(MapField::new(el.name.clone(), key, value)
            .with_nullable(el.repetition_or_required() == Repetition::Optional)
            .with_container_name(elements[index + 1].name.clone())
            .into())
    }

    fn describe_as_physical_elements(
        &self,
        field: &Field,
        registry: &TypeRegistry,
        out: &mut Vec<SchemaElement>,
    ) -> Result<()> {
        let Field::Map(map) = field else {
            return Err(ParquetError::Internal("map handler given a non-map field".into()));
        };
        out.push(
            SchemaElement::group(map.name.clone(), nullable_repetition(map.nullable), 1)
                .with_converted_type(ConvertedType::Map),
        );
        out.push(SchemaElement::group(map.container_name(), Repetition::Repeated, 2));
        registry.describe_physical(&map.key, out)?;
        registry.describe_physical(&map.value, out)
    }
}

/// Un-annotated groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructHandler;

impl TypeHandler for StructHandler {
    fn name(&self) -> &'static str {
        "struct"
    }

    fn signatures(&self) -> Vec<TypeSignature> {
        vec![TypeSignature::group(None)]
    }

    fn handles_field(&self, field: &Field) -> bool {
        matches!(field, Field::Struct(_))
    }

    fn span(&self, elements: &[SchemaElement], index: usize) -> Result<(usize, usize)> {
        let el = &elements[index];
        if el.repetition_or_required() == Repetition::Repeated {
            return Err(ParquetError::HandlerNotFound(format!(
                "repeated group '{}' outside a LIST or MAP",
                el.name
            )));
        }
        Ok((1, el.child_count()))
    }

    fn describe_as_logical_field(
        &self,
        elements: &[SchemaElement],
        index: usize,
        children: Vec<Field>,
        _options: &ParquetOptions,
    ) -> Result<Field> {
        let el = &elements[index];
        Ok(StructField::new(el.name.clone(), children)
            .with_nullable(el.repetition_or_required() == Repetition::Optional)
            .into())
    }

    fn describe_as_physical_elements(
        &self,
        field: &Field,
        registry: &TypeRegistry,
        out: &mut Vec<SchemaElement>,
    ) -> Result<()> {
        let Field::Struct(s) = field else {
            return Err(ParquetError::Internal("struct handler given a non-struct field".into()));
        };
        out.push(SchemaElement::group(
            s.name.clone(),
            nullable_repetition(s.nullable),
            s.fields.len(),
        ));
        for child in &s.fields {
            registry.describe_physical(child, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::schema::{DataField, DataType};

    #[test]
    fn list_emits_three_levels() {
        let reg = TypeRegistry::with_builtins();
        let list = ListField::new("xs", DataField::optional("element", DataType::Int32));
        let mut out = Vec::new();
        reg.describe_physical(&list.into(), &mut out).unwrap();
        let names: Vec<&str> = out.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["xs", "list", "element"]);
        assert_eq!(out[0].converted_type, Some(ConvertedType::List));
        assert_eq!(out[1].repetition, Some(Repetition::Repeated));
    }

    #[test]
    fn two_level_list_is_rejected() {
        let elements = vec![
            SchemaElement::group("xs", Repetition::Optional, 1).with_converted_type(ConvertedType::List),
            SchemaElement::leaf(
                "array",
                crate::models::types::parquet::PhysicalType::Int32,
                Repetition::Repeated,
            ),
        ];
        assert!(ListHandler.span(&elements, 0).is_err());
    }

    #[test]
    fn map_spans_key_value_group() {
        let reg = TypeRegistry::with_builtins();
        let map = MapField::new(
            "m",
            DataField::new("key", DataType::String),
            DataField::optional("value", DataType::Int64),
        );
        let mut out = Vec::new();
        reg.describe_physical(&map.into(), &mut out).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(MapHandler.span(&out, 0).unwrap(), (2, 2));
    }
}
