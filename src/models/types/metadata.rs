//! # Footer and Page Descriptors
//!
//! In-memory form of everything the metadata codec serialises: the file
//! descriptor stored in the footer (schema list, row groups, key/value
//! metadata) and the per-page headers that precede each page payload.

use crate::compression::Compression;
use crate::error::Result;
use crate::models::types::parquet::{ConvertedType, Encoding, PageType, PhysicalType, Repetition};

/// Complete Parquet file metadata stored in the footer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetaData {
    /// Parquet format version (e.g. 1).
    pub version: i32,
    /// Flattened schema elements (root + fields), pre-order.
    pub schema: Vec<SchemaElement>,
    /// Total number of rows across all row groups.
    pub num_rows: i64,
    /// Row group descriptors with column chunk metadata.
    pub row_groups: Vec<RowGroupDescriptor>,
    /// Ordered key/value pairs carrying producer-specific metadata.
    pub key_value_metadata: Vec<KeyValue>,
    /// Optional producer string.
    pub created_by: Option<String>,
}

/// Schema element describing a node in the schema tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaElement {
    /// Column or group name.
    pub name: String,
    /// Physical type for leaf nodes; `None` for groups.
    pub physical_type: Option<PhysicalType>,
    /// Byte width for FIXED_LEN_BYTE_ARRAY.
    pub type_length: Option<i32>,
    /// Repetition marker. Absent only on some writers' root element.
    pub repetition: Option<Repetition>,
    /// Number of immediate children for groups.
    pub num_children: Option<i32>,
    /// Legacy converted type, if any.
    pub converted_type: Option<ConvertedType>,
    /// Decimal scale (if applicable).
    pub scale: Option<i32>,
    /// Decimal precision (if applicable).
    pub precision: Option<i32>,
    /// Field ID (optional).
    pub field_id: Option<i32>,
}

impl SchemaElement {
    /// A leaf carrying a physical type.
    pub fn leaf(name: impl Into<String>, physical_type: PhysicalType, repetition: Repetition) -> Self {
        Self {
            name: name.into(),
            physical_type: Some(physical_type),
            repetition: Some(repetition),
            ..Default::default()
        }
    }

    /// A group node with `num_children` immediate children.
    pub fn group(name: impl Into<String>, repetition: Repetition, num_children: usize) -> Self {
        Self {
            name: name.into(),
            repetition: Some(repetition),
            num_children: Some(num_children as i32),
            ..Default::default()
        }
    }

    pub fn with_converted_type(mut self, converted: ConvertedType) -> Self {
        self.converted_type = Some(converted);
        self
    }

    pub fn child_count(&self) -> usize {
        self.num_children.unwrap_or(0).max(0) as usize
    }

    /// Groups have no physical type.
    pub fn is_group(&self) -> bool {
        self.physical_type.is_none()
    }

    pub fn repetition_or_required(&self) -> Repetition {
        self.repetition.unwrap_or(Repetition::Required)
    }

    /// Structural equality used when validating an append target; ignores field ids.
    pub fn same_shape(&self, other: &SchemaElement) -> bool {
        self.name == other.name
            && self.physical_type == other.physical_type
            && self.type_length == other.type_length
            && self.repetition_or_required() == other.repetition_or_required()
            && self.child_count() == other.child_count()
            && self.converted_type == other.converted_type
            && self.scale == other.scale
            && self.precision == other.precision
    }
}

/// One custom metadata pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

/// Row group descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowGroupDescriptor {
    /// Column chunks within this row group, in schema leaf order.
    pub columns: Vec<ColumnChunkDescriptor>,
    /// Sum of the chunks' uncompressed sizes.
    pub total_byte_size: i64,
    /// Number of rows in this row group.
    pub num_rows: i64,
    /// Offset of the first chunk.
    pub file_offset: Option<i64>,
    /// Sum of the chunks' compressed sizes.
    pub total_compressed_size: Option<i64>,
    /// Position of this row group in the file.
    pub ordinal: Option<i16>,
}

/// Column chunk descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnChunkDescriptor {
    /// External file holding the chunk; unsupported when set.
    pub file_path: Option<String>,
    /// File offset to the start of this column chunk.
    pub file_offset: i64,
    /// Detailed per-column metadata.
    pub meta_data: Option<ColumnMetaData>,
}

impl ColumnChunkDescriptor {
    pub fn path(&self) -> &[String] {
        self.meta_data
            .as_ref()
            .map(|m| m.path_in_schema.as_slice())
            .unwrap_or(&[])
    }
}

/// Column metadata for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetaData {
    /// Physical type of the column.
    pub physical_type: PhysicalType,
    /// Encodings used in this column chunk.
    pub encodings: Vec<Encoding>,
    /// Path in the schema (ancestor names, root excluded).
    pub path_in_schema: Vec<String>,
    /// Compression codec id as stored; resolved when the chunk is read.
    pub codec: i32,
    /// Total number of level slots in this column chunk.
    pub num_values: i64,
    /// Uncompressed byte size of this column chunk, page headers included.
    pub total_uncompressed_size: i64,
    /// Compressed byte size of this column chunk, page headers included.
    pub total_compressed_size: i64,
    /// Byte offset to the first data page of this column chunk.
    pub data_page_offset: i64,
    /// Byte offset to the index page, if any.
    pub index_page_offset: Option<i64>,
    /// Optional byte offset to the dictionary page (if present).
    pub dictionary_page_offset: Option<i64>,
    /// Optional per-column statistics.
    pub statistics: Option<Statistics>,
}

impl ColumnMetaData {
    pub fn compression(&self) -> Result<Compression> {
        Compression::from_i32(self.codec)
    }

    /// First byte of the chunk: dictionary page when present, else first data page.
    pub fn chunk_start(&self) -> i64 {
        match self.dictionary_page_offset {
            Some(d) if d > 0 && d < self.data_page_offset => d,
            _ => self.data_page_offset,
        }
    }
}

/// Parquet statistics for a column (min/max, null/unique counts).
///
/// => Min, max, null/unique count
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    /// Legacy maximum (signed comparison, deprecated).
    pub max: Option<Vec<u8>>,
    /// Legacy minimum (signed comparison, deprecated).
    pub min: Option<Vec<u8>>,
    /// Number of null values (if recorded).
    pub null_count: Option<i64>,
    /// Number of distinct values (if recorded).
    pub distinct_count: Option<i64>,
    /// Maximum value, plain-encoded.
    pub max_value: Option<Vec<u8>>,
    /// Minimum value, plain-encoded.
    pub min_value: Option<Vec<u8>>,
}

/// Parquet DataPage v1 header.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPageHeader {
    /// Number of values in the page (including nulls and repeats).
    pub num_values: i32,
    /// Value encoding.
    pub encoding: Encoding,
    /// Encoding for definition levels.
    pub definition_level_encoding: Encoding,
    /// Encoding for repetition levels.
    pub repetition_level_encoding: Encoding,
    /// Optional statistics for this page.
    pub statistics: Option<Statistics>,
}

/// Parquet DataPage v2 header.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPageHeaderV2 {
    /// Number of values in the page (including nulls and repeats).
    pub num_values: i32,
    /// Number of nulls in the page.
    pub num_nulls: i32,
    /// Number of rows in the page.
    pub num_rows: i32,
    /// Value encoding.
    pub encoding: Encoding,
    /// Byte length of the definition levels (uncompressed, no prefix).
    pub definition_levels_byte_length: i32,
    /// Byte length of the repetition levels (uncompressed, no prefix).
    pub repetition_levels_byte_length: i32,
    /// Whether the values section is compressed. Defaults to true.
    pub is_compressed: Option<bool>,
    /// Optional statistics for this page.
    pub statistics: Option<Statistics>,
}

/// Dictionary page header.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryPageHeader {
    /// Number of dictionary entries.
    pub num_values: i32,
    /// Dictionary value encoding (PLAIN or PLAIN_DICTIONARY).
    pub encoding: Encoding,
    /// Whether the entries are sorted.
    pub is_sorted: Option<bool>,
}

/// Header preceding every page payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub crc: Option<i32>,
    pub data_page_header: Option<DataPageHeader>,
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

impl PageHeader {
    pub fn new(page_type: PageType, uncompressed: usize, compressed: usize) -> Self {
        Self {
            page_type,
            uncompressed_page_size: uncompressed as i32,
            compressed_page_size: compressed as i32,
            crc: None,
            data_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: None,
        }
    }
}
