//! # Test Helpers - *Schema and Column Fixtures*
//!
//! Deterministic schemas and matching columns used by unit tests, plus an
//! in-memory write-then-open helper. Flat fixtures have 4 rows.

use std::io::Cursor;

use crate::models::file::{ParquetFile, write_single_row_group};
use crate::models::types::column::Column;
use crate::models::types::schema::{DataField, DataType, Field, ListField, Schema, StructField};
use crate::options::ParquetOptions;

// -------------------- Schemas -------------------- //

/// `id: int32` (required), `name: string?`, `score: double?`, `flag: boolean`.
pub(crate) fn flat_schema() -> Schema {
    Schema::new(vec![
        DataField::new("id", DataType::Int32),
        DataField::optional("name", DataType::String),
        DataField::optional("score", DataType::Double),
        DataField::new("flag", DataType::Boolean),
    ])
}

/// `tags: list<string?>?` followed by `id: int64`.
pub(crate) fn list_schema() -> Schema {
    Schema::new(vec![
        Field::from(ListField::new("tags", DataField::optional("element", DataType::String))),
        Field::from(DataField::new("id", DataType::Int64)),
    ])
}

/// `point: struct { x: int32, y: int32? }?`.
pub(crate) fn struct_schema() -> Schema {
    Schema::new(vec![
        StructField::new(
            "point",
            vec![
                DataField::new("x", DataType::Int32).into(),
                DataField::optional("y", DataType::Int32).into(),
            ],
        )
        .with_nullable(true),
    ])
}

// -------------------- Columns -------------------- //

fn field(schema: &Schema, path: &str) -> DataField {
    schema
        .data_field(path)
        .unwrap_or_else(|| panic!("fixture schema has no leaf '{path}'"))
}

/// Columns for [`flat_schema`], with one null in each nullable column.
pub(crate) fn flat_columns(schema: &Schema) -> Vec<Column> {
    vec![
        Column::new(field(schema, "id"), vec![1i32, 2, 3, 4]),
        Column::from_options(
            field(schema, "name"),
            vec![Some("alpha".to_string()), None, Some("gamma".to_string()), Some("delta".to_string())],
        ),
        Column::from_options(field(schema, "score"), vec![Some(1.5f64), Some(-2.25), None, Some(0.0)]),
        Column::new(field(schema, "flag"), vec![true, false, false, true]),
    ]
}

/// Rows `[["a", "b"], [], null, ["c", null]]` with ids 10..=13.
pub(crate) fn list_columns(schema: &Schema) -> Vec<Column> {
    let tags = Column::from_options(
        field(schema, "tags.list.element"),
        vec![Some("a".to_string()), Some("b".to_string()), None, None, Some("c".to_string()), None],
    )
    .with_definition_levels(vec![3, 3, 1, 0, 3, 2])
    .with_repetition_levels(vec![0, 1, 0, 0, 0, 1]);
    vec![tags, Column::new(field(schema, "id"), vec![10i64, 11, 12, 13])]
}

// -------------------- Containers -------------------- //

/// Write `columns` as one row group into memory and open the result.
pub(crate) async fn roundtrip(
    schema: Schema,
    columns: &[Column],
    options: ParquetOptions,
) -> ParquetFile<Cursor<Vec<u8>>> {
    let cursor = write_single_row_group(Cursor::new(Vec::new()), schema, columns, options.clone())
        .await
        .expect("write");
    ParquetFile::open(Cursor::new(cursor.into_inner()), options)
        .await
        .expect("open")
}
