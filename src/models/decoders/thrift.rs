//! # Thrift Compact Decoding
//!
//! Slice-backed Thrift Compact Protocol reader and the parsers for the footer
//! and page header structs. Unknown fields are skipped so files written by
//! newer producers still open. Running out of bytes mid-structure yields
//! [`ParquetError::UnexpectedEof`], which the page reader uses to widen its
//! header window.

use crate::error::{ParquetError, Result};
use crate::models::encoders::parquet::metadata::ctype;
use crate::models::types::metadata::{
    ColumnChunkDescriptor, ColumnMetaData, DataPageHeader, DataPageHeaderV2,
    DictionaryPageHeader, FileMetaData, KeyValue, PageHeader, RowGroupDescriptor, SchemaElement,
    Statistics,
};
use crate::models::types::parquet::{ConvertedType, Encoding, PageType, PhysicalType, Repetition};
use crate::utils::zigzag_decode;

const MAX_SKIP_DEPTH: usize = 64;

/// A decoded field header.
#[derive(Debug, Clone, Copy)]
struct FieldHeader {
    field_type: u8,
    id: i16,
    /// Value of a boolean field, carried in the header itself.
    bool_value: Option<bool>,
}

pub(crate) struct CompactReader<'a> {
    buf: &'a [u8],
    pos: usize,
    last_field_id: i16,
    stack: Vec<i16>,
}

impl<'a> CompactReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            last_field_id: 0,
            stack: Vec::new(),
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_byte(&mut self) -> Result<u8> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| ParquetError::UnexpectedEof("thrift input".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&e| e <= self.buf.len())
            .ok_or_else(|| ParquetError::UnexpectedEof(format!("thrift binary of {len} bytes")))?;
        let s = &self.buf[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    fn read_varint(&mut self) -> Result<u64> {
        let mut val: u64 = 0;
        let mut shift = 0;
        loop {
            let b = self.read_byte()?;
            val |= ((b & 0x7F) as u64) << shift;
            if b & 0x80 == 0 {
                return Ok(val);
            }
            shift += 7;
            if shift >= 64 {
                return Err(ParquetError::Metadata("varint too long".into()));
            }
        }
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(zigzag_decode(self.read_varint()?) as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(zigzag_decode(self.read_varint()?) as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(zigzag_decode(self.read_varint()?))
    }

    pub fn read_binary(&mut self) -> Result<&'a [u8]> {
        let len = self.read_varint()? as usize;
        self.read_slice(len)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let b = self.read_binary()?;
        Ok(String::from_utf8(b.to_vec())?)
    }

    fn read_double(&mut self) -> Result<()> {
        self.read_slice(8).map(|_| ())
    }

    /// List or set header: `(element_type, len)`.
    pub fn read_list_begin(&mut self) -> Result<(u8, usize)> {
        let header = self.read_byte()?;
        let elem_type = header & 0x0F;
        let short = (header >> 4) as usize;
        let len = if short == 0x0F {
            self.read_varint()? as usize
        } else {
            short
        };
        Ok((elem_type, len))
    }

    pub fn struct_begin(&mut self) {
        self.stack.push(self.last_field_id);
        self.last_field_id = 0;
    }

    pub fn struct_end(&mut self) {
        self.last_field_id = self.stack.pop().unwrap_or(0);
    }

    /// Next field header, or `None` at the struct's stop byte.
    fn read_field_begin(&mut self) -> Result<Option<FieldHeader>> {
        let header = self.read_byte()?;
        let field_type = header & 0x0F;
        if field_type == ctype::STOP {
            return Ok(None);
        }
        let delta = (header >> 4) as i16;
        let id = if delta != 0 {
            self.last_field_id + delta
        } else {
            self.read_i16()?
        };
        self.last_field_id = id;
        let bool_value = match field_type {
            ctype::BOOL_TRUE => Some(true),
            ctype::BOOL_FALSE => Some(false),
            _ => None,
        };
        Ok(Some(FieldHeader {
            field_type,
            id,
            bool_value,
        }))
    }

    fn skip(&mut self, field_type: u8) -> Result<()> {
        self.skip_till_depth(field_type, MAX_SKIP_DEPTH)
    }

    fn skip_till_depth(&mut self, field_type: u8, depth: usize) -> Result<()> {
        if depth == 0 {
            return Err(ParquetError::Metadata("thrift nesting too deep".into()));
        }
        match field_type {
            ctype::BOOL_TRUE | ctype::BOOL_FALSE => Ok(()),
            ctype::BYTE => self.read_byte().map(|_| ()),
            ctype::I16 | ctype::I32 | ctype::I64 => self.read_varint().map(|_| ()),
            ctype::DOUBLE => self.read_double(),
            ctype::BINARY => self.read_binary().map(|_| ()),
            ctype::STRUCT => {
                self.struct_begin();
                while let Some(f) = self.read_field_begin()? {
                    self.skip_till_depth(f.field_type, depth - 1)?;
                }
                self.struct_end();
                Ok(())
            }
            ctype::LIST | ctype::SET => {
                let (elem, len) = self.read_list_begin()?;
                for _ in 0..len {
                    // bools inside collections take a full byte
                    if elem == ctype::BOOL_TRUE || elem == ctype::BOOL_FALSE {
                        self.read_byte()?;
                    } else {
                        self.skip_till_depth(elem, depth - 1)?;
                    }
                }
                Ok(())
            }
            ctype::MAP => {
                let len = self.read_varint()? as usize;
                if len == 0 {
                    return Ok(());
                }
                let kinds = self.read_byte()?;
                let (kt, vt) = (kinds >> 4, kinds & 0x0F);
                for _ in 0..len {
                    self.skip_till_depth(kt, depth - 1)?;
                    self.skip_till_depth(vt, depth - 1)?;
                }
                Ok(())
            }
            other => Err(ParquetError::Metadata(format!("unknown thrift type {other}"))),
        }
    }

    /// Iterate fields of the current struct, dispatching to `f`. The callback
    /// returns `false` for fields it does not recognise; those are skipped.
    fn read_struct<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, FieldHeader) -> Result<bool>,
    {
        self.struct_begin();
        while let Some(h) = self.read_field_begin()? {
            if !f(self, h)? {
                self.skip(h.field_type)?;
            }
        }
        self.struct_end();
        Ok(())
    }

    fn read_struct_list<T, F>(&mut self, mut parse: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let (elem, len) = self.read_list_begin()?;
        if elem != ctype::STRUCT {
            return Err(ParquetError::Metadata(format!(
                "expected list<struct>, found element type {elem}"
            )));
        }
        let mut out = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            out.push(parse(self)?);
        }
        Ok(out)
    }
}

fn required<T>(v: Option<T>, what: &str) -> Result<T> {
    v.ok_or_else(|| ParquetError::Metadata(format!("missing required field {what}")))
}

fn encoding(v: i32) -> Result<Encoding> {
    Encoding::from_i32(v).ok_or_else(|| ParquetError::Metadata(format!("unknown encoding id {v}")))
}

fn physical_type(v: i32) -> Result<PhysicalType> {
    PhysicalType::from_i32(v).ok_or_else(|| ParquetError::Metadata(format!("unknown physical type {v}")))
}

// --------------------- Footer ------------------------------------ //

/// Parse the footer bytes into a [`FileMetaData`].
pub(crate) fn read_file_metadata(buf: &[u8]) -> Result<FileMetaData> {
    let mut r = CompactReader::new(buf);
    let mut version = None;
    let mut schema = None;
    let mut num_rows = None;
    let mut row_groups = None;
    let mut key_value_metadata = Vec::new();
    let mut created_by = None;

    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::I32) => version = Some(r.read_i32()?),
            (2, ctype::LIST) => schema = Some(r.read_struct_list(parse_schema_element)?),
            (3, ctype::I64) => num_rows = Some(r.read_i64()?),
            (4, ctype::LIST) => row_groups = Some(r.read_struct_list(parse_row_group)?),
            (5, ctype::LIST) => key_value_metadata = r.read_struct_list(parse_key_value)?,
            (6, ctype::BINARY) => created_by = Some(r.read_string()?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(FileMetaData {
        version: required(version, "FileMetaData.version")?,
        schema: required(schema, "FileMetaData.schema")?,
        num_rows: required(num_rows, "FileMetaData.num_rows")?,
        row_groups: required(row_groups, "FileMetaData.row_groups")?,
        key_value_metadata,
        created_by,
    })
}

fn parse_schema_element(r: &mut CompactReader<'_>) -> Result<SchemaElement> {
    let mut el = SchemaElement::default();
    let mut name = None;
    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::I32) => el.physical_type = Some(physical_type(r.read_i32()?)?),
            (2, ctype::I32) => el.type_length = Some(r.read_i32()?),
            (3, ctype::I32) => {
                let v = r.read_i32()?;
                el.repetition = Some(Repetition::from_i32(v).ok_or_else(|| {
                    ParquetError::Metadata(format!("unknown repetition type {v}"))
                })?)
            }
            (4, ctype::BINARY) => name = Some(r.read_string()?),
            (5, ctype::I32) => el.num_children = Some(r.read_i32()?),
            (6, ctype::I32) => el.converted_type = Some(ConvertedType::from_i32(r.read_i32()?)),
            (7, ctype::I32) => el.scale = Some(r.read_i32()?),
            (8, ctype::I32) => el.precision = Some(r.read_i32()?),
            (9, ctype::I32) => el.field_id = Some(r.read_i32()?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    el.name = required(name, "SchemaElement.name")?;
    Ok(el)
}

fn parse_key_value(r: &mut CompactReader<'_>) -> Result<KeyValue> {
    let mut key = None;
    let mut value = None;
    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::BINARY) => key = Some(r.read_string()?),
            (2, ctype::BINARY) => value = Some(r.read_string()?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(KeyValue {
        key: required(key, "KeyValue.key")?,
        value,
    })
}

fn parse_row_group(r: &mut CompactReader<'_>) -> Result<RowGroupDescriptor> {
    let mut rg = RowGroupDescriptor::default();
    let mut columns = None;
    let mut total_byte_size = None;
    let mut num_rows = None;
    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::LIST) => columns = Some(r.read_struct_list(parse_column_chunk)?),
            (2, ctype::I64) => total_byte_size = Some(r.read_i64()?),
            (3, ctype::I64) => num_rows = Some(r.read_i64()?),
            (5, ctype::I64) => rg.file_offset = Some(r.read_i64()?),
            (6, ctype::I64) => rg.total_compressed_size = Some(r.read_i64()?),
            (7, ctype::I16) => rg.ordinal = Some(r.read_i16()?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    rg.columns = required(columns, "RowGroup.columns")?;
    rg.total_byte_size = required(total_byte_size, "RowGroup.total_byte_size")?;
    rg.num_rows = required(num_rows, "RowGroup.num_rows")?;
    Ok(rg)
}

fn parse_column_chunk(r: &mut CompactReader<'_>) -> Result<ColumnChunkDescriptor> {
    let mut cc = ColumnChunkDescriptor::default();
    let mut file_offset = None;
    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::BINARY) => cc.file_path = Some(r.read_string()?),
            (2, ctype::I64) => file_offset = Some(r.read_i64()?),
            (3, ctype::STRUCT) => cc.meta_data = Some(parse_column_meta_data(r)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    cc.file_offset = required(file_offset, "ColumnChunk.file_offset")?;
    Ok(cc)
}

fn parse_column_meta_data(r: &mut CompactReader<'_>) -> Result<ColumnMetaData> {
    let mut physical = None;
    let mut encodings = Vec::new();
    let mut path_in_schema = None;
    let mut codec = None;
    let mut num_values = None;
    let mut total_uncompressed_size = None;
    let mut total_compressed_size = None;
    let mut data_page_offset = None;
    let mut index_page_offset = None;
    let mut dictionary_page_offset = None;
    let mut statistics = None;

    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::I32) => physical = Some(physical_type(r.read_i32()?)?),
            (2, ctype::LIST) => {
                let (_, len) = r.read_list_begin()?;
                for _ in 0..len {
                    // encodings newer than this reader are informational only
                    if let Some(e) = Encoding::from_i32(r.read_i32()?) {
                        encodings.push(e);
                    }
                }
            }
            (3, ctype::LIST) => {
                let (_, len) = r.read_list_begin()?;
                let mut path = Vec::with_capacity(len.min(64));
                for _ in 0..len {
                    path.push(r.read_string()?);
                }
                path_in_schema = Some(path);
            }
            (4, ctype::I32) => codec = Some(r.read_i32()?),
            (5, ctype::I64) => num_values = Some(r.read_i64()?),
            (6, ctype::I64) => total_uncompressed_size = Some(r.read_i64()?),
            (7, ctype::I64) => total_compressed_size = Some(r.read_i64()?),
            (9, ctype::I64) => data_page_offset = Some(r.read_i64()?),
            (10, ctype::I64) => index_page_offset = Some(r.read_i64()?),
            (11, ctype::I64) => dictionary_page_offset = Some(r.read_i64()?),
            (12, ctype::STRUCT) => statistics = Some(parse_statistics(r)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(ColumnMetaData {
        physical_type: required(physical, "ColumnMetaData.type")?,
        encodings,
        path_in_schema: required(path_in_schema, "ColumnMetaData.path_in_schema")?,
        codec: required(codec, "ColumnMetaData.codec")?,
        num_values: required(num_values, "ColumnMetaData.num_values")?,
        total_uncompressed_size: required(total_uncompressed_size, "ColumnMetaData.total_uncompressed_size")?,
        total_compressed_size: required(total_compressed_size, "ColumnMetaData.total_compressed_size")?,
        data_page_offset: required(data_page_offset, "ColumnMetaData.data_page_offset")?,
        index_page_offset,
        dictionary_page_offset,
        statistics,
    })
}

fn parse_statistics(r: &mut CompactReader<'_>) -> Result<Statistics> {
    let mut s = Statistics::default();
    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::BINARY) => s.max = Some(r.read_binary()?.to_vec()),
            (2, ctype::BINARY) => s.min = Some(r.read_binary()?.to_vec()),
            (3, ctype::I64) => s.null_count = Some(r.read_i64()?),
            (4, ctype::I64) => s.distinct_count = Some(r.read_i64()?),
            (5, ctype::BINARY) => s.max_value = Some(r.read_binary()?.to_vec()),
            (6, ctype::BINARY) => s.min_value = Some(r.read_binary()?.to_vec()),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(s)
}

// --------------------- Page headers ------------------------------------ //

/// Parse one page header from the front of `buf`, returning it with the
/// number of bytes it occupied.
pub(crate) fn read_page_header(buf: &[u8]) -> Result<(PageHeader, usize)> {
    let mut r = CompactReader::new(buf);
    let mut page_type = None;
    let mut uncompressed = None;
    let mut compressed = None;
    let mut crc = None;
    let mut data_page_header = None;
    let mut dictionary_page_header = None;
    let mut data_page_header_v2 = None;

    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::I32) => {
                let v = r.read_i32()?;
                page_type = Some(
                    PageType::from_i32(v)
                        .ok_or_else(|| ParquetError::Metadata(format!("unknown page type {v}")))?,
                );
            }
            (2, ctype::I32) => uncompressed = Some(r.read_i32()?),
            (3, ctype::I32) => compressed = Some(r.read_i32()?),
            (4, ctype::I32) => crc = Some(r.read_i32()?),
            (5, ctype::STRUCT) => data_page_header = Some(parse_data_page_header(r)?),
            (7, ctype::STRUCT) => dictionary_page_header = Some(parse_dictionary_page_header(r)?),
            (8, ctype::STRUCT) => data_page_header_v2 = Some(parse_data_page_header_v2(r)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    let header = PageHeader {
        page_type: required(page_type, "PageHeader.type")?,
        uncompressed_page_size: required(uncompressed, "PageHeader.uncompressed_page_size")?,
        compressed_page_size: required(compressed, "PageHeader.compressed_page_size")?,
        crc,
        data_page_header,
        dictionary_page_header,
        data_page_header_v2,
    };
    Ok((header, r.position()))
}

fn parse_data_page_header(r: &mut CompactReader<'_>) -> Result<DataPageHeader> {
    let mut num_values = None;
    let mut enc = None;
    let mut def_enc = None;
    let mut rep_enc = None;
    let mut statistics = None;
    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::I32) => num_values = Some(r.read_i32()?),
            (2, ctype::I32) => enc = Some(encoding(r.read_i32()?)?),
            (3, ctype::I32) => def_enc = Some(encoding(r.read_i32()?)?),
            (4, ctype::I32) => rep_enc = Some(encoding(r.read_i32()?)?),
            (5, ctype::STRUCT) => statistics = Some(parse_statistics(r)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(DataPageHeader {
        num_values: required(num_values, "DataPageHeader.num_values")?,
        encoding: required(enc, "DataPageHeader.encoding")?,
        definition_level_encoding: required(def_enc, "DataPageHeader.definition_level_encoding")?,
        repetition_level_encoding: required(rep_enc, "DataPageHeader.repetition_level_encoding")?,
        statistics,
    })
}

fn parse_dictionary_page_header(r: &mut CompactReader<'_>) -> Result<DictionaryPageHeader> {
    let mut num_values = None;
    let mut enc = None;
    let mut is_sorted = None;
    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::I32) => num_values = Some(r.read_i32()?),
            (2, ctype::I32) => enc = Some(encoding(r.read_i32()?)?),
            (3, ctype::BOOL_TRUE | ctype::BOOL_FALSE) => is_sorted = h.bool_value,
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(DictionaryPageHeader {
        num_values: required(num_values, "DictionaryPageHeader.num_values")?,
        encoding: required(enc, "DictionaryPageHeader.encoding")?,
        is_sorted,
    })
}

fn parse_data_page_header_v2(r: &mut CompactReader<'_>) -> Result<DataPageHeaderV2> {
    let mut num_values = None;
    let mut num_nulls = None;
    let mut num_rows = None;
    let mut enc = None;
    let mut def_len = None;
    let mut rep_len = None;
    let mut is_compressed = None;
    let mut statistics = None;
    r.read_struct(|r, h| {
        match (h.id, h.field_type) {
            (1, ctype::I32) => num_values = Some(r.read_i32()?),
            (2, ctype::I32) => num_nulls = Some(r.read_i32()?),
            (3, ctype::I32) => num_rows = Some(r.read_i32()?),
            (4, ctype::I32) => enc = Some(encoding(r.read_i32()?)?),
            (5, ctype::I32) => def_len = Some(r.read_i32()?),
            (6, ctype::I32) => rep_len = Some(r.read_i32()?),
            (7, ctype::BOOL_TRUE | ctype::BOOL_FALSE) => is_compressed = h.bool_value,
            (8, ctype::STRUCT) => statistics = Some(parse_statistics(r)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(DataPageHeaderV2 {
        num_values: required(num_values, "DataPageHeaderV2.num_values")?,
        num_nulls: required(num_nulls, "DataPageHeaderV2.num_nulls")?,
        num_rows: required(num_rows, "DataPageHeaderV2.num_rows")?,
        encoding: required(enc, "DataPageHeaderV2.encoding")?,
        definition_levels_byte_length: required(def_len, "DataPageHeaderV2.definition_levels_byte_length")?,
        repetition_levels_byte_length: required(rep_len, "DataPageHeaderV2.repetition_levels_byte_length")?,
        is_compressed,
        statistics,
    })
}
