//! # Parquet Footer and Page Header Serialisation
//!
//! Thrift Compact Protocol writers for the footer (`FileMetaData`) and page
//! headers (DataPage v1/v2, Dictionary), using the field ids of
//! `parquet.thrift`. Optional fields are omitted when `None`.
//!
//! Field headers carry the id as a delta from the previous id in the same
//! struct when it fits in four bits, otherwise a full zigzag `i16` follows.
//! Booleans live in the field header's type nibble.

use crate::models::types::metadata::{
    ColumnChunkDescriptor, ColumnMetaData, DataPageHeader, DataPageHeaderV2,
    DictionaryPageHeader, FileMetaData, KeyValue, PageHeader, RowGroupDescriptor, SchemaElement,
    Statistics,
};
use crate::utils::{write_uleb128, zigzag_encode};

/// Compact protocol type nibbles.
pub(crate) mod ctype {
    pub const STOP: u8 = 0;
    pub const BOOL_TRUE: u8 = 1;
    pub const BOOL_FALSE: u8 = 2;
    pub const BYTE: u8 = 3;
    pub const I16: u8 = 4;
    pub const I32: u8 = 5;
    pub const I64: u8 = 6;
    pub const DOUBLE: u8 = 7;
    pub const BINARY: u8 = 8;
    pub const LIST: u8 = 9;
    pub const SET: u8 = 10;
    pub const MAP: u8 = 11;
    pub const STRUCT: u8 = 12;
}

/// Stateful compact-protocol writer appending to a byte vector.
pub(crate) struct CompactWriter<'a> {
    out: &'a mut Vec<u8>,
    last_field_id: i16,
    stack: Vec<i16>,
}

impl<'a> CompactWriter<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self {
            out,
            last_field_id: 0,
            stack: Vec::new(),
        }
    }

    pub fn struct_begin(&mut self) {
        self.stack.push(self.last_field_id);
        self.last_field_id = 0;
    }

    pub fn struct_end(&mut self) {
        self.out.push(ctype::STOP);
        self.last_field_id = self.stack.pop().unwrap_or(0);
    }

    fn field_begin(&mut self, field_type: u8, id: i16) {
        let delta = id - self.last_field_id;
        if delta > 0 && delta <= 15 {
            self.out.push(((delta as u8) << 4) | field_type);
        } else {
            self.out.push(field_type);
            self.write_i16(id);
        }
        self.last_field_id = id;
    }

    fn write_varint(&mut self, v: u64) {
        write_uleb128(v, self.out);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.write_varint(zigzag_encode(v as i64));
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_varint(zigzag_encode(v as i64));
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_varint(zigzag_encode(v));
    }

    pub fn write_binary(&mut self, b: &[u8]) {
        self.write_varint(b.len() as u64);
        self.out.extend_from_slice(b);
    }

    pub fn list_begin(&mut self, elem_type: u8, len: usize) {
        if len < 15 {
            self.out.push(((len as u8) << 4) | elem_type);
        } else {
            self.out.push(0xF0 | elem_type);
            self.write_varint(len as u64);
        }
    }

    pub fn i16_field(&mut self, id: i16, v: i16) {
        self.field_begin(ctype::I16, id);
        self.write_i16(v);
    }

    pub fn i32_field(&mut self, id: i16, v: i32) {
        self.field_begin(ctype::I32, id);
        self.write_i32(v);
    }

    pub fn i64_field(&mut self, id: i16, v: i64) {
        self.field_begin(ctype::I64, id);
        self.write_i64(v);
    }

    pub fn bool_field(&mut self, id: i16, v: bool) {
        self.field_begin(if v { ctype::BOOL_TRUE } else { ctype::BOOL_FALSE }, id);
    }

    pub fn binary_field(&mut self, id: i16, b: &[u8]) {
        self.field_begin(ctype::BINARY, id);
        self.write_binary(b);
    }

    pub fn string_field(&mut self, id: i16, s: &str) {
        self.binary_field(id, s.as_bytes());
    }

    pub fn list_field_begin(&mut self, id: i16, elem_type: u8, len: usize) {
        self.field_begin(ctype::LIST, id);
        self.list_begin(elem_type, len);
    }

    /// Field header for a nested struct; follow with the struct's fields and `struct_end`.
    pub fn struct_field_begin(&mut self, id: i16) {
        self.field_begin(ctype::STRUCT, id);
        self.struct_begin();
    }

    fn opt_i32_field(&mut self, id: i16, v: Option<i32>) {
        if let Some(v) = v {
            self.i32_field(id, v);
        }
    }

    fn opt_i64_field(&mut self, id: i16, v: Option<i64>) {
        if let Some(v) = v {
            self.i64_field(id, v);
        }
    }

    fn opt_binary_field(&mut self, id: i16, v: Option<&[u8]>) {
        if let Some(v) = v {
            self.binary_field(id, v);
        }
    }
}

// --------------------- Footer ------------------------------------ //

/// Serialise the footer, appending to `out`.
pub(crate) fn write_file_metadata(meta: &FileMetaData, out: &mut Vec<u8>) {
    let mut w = CompactWriter::new(out);
    w.struct_begin();
    w.i32_field(1, meta.version);

    w.list_field_begin(2, ctype::STRUCT, meta.schema.len());
    for el in &meta.schema {
        write_schema_element(&mut w, el);
    }

    w.i64_field(3, meta.num_rows);

    w.list_field_begin(4, ctype::STRUCT, meta.row_groups.len());
    for rg in &meta.row_groups {
        write_row_group(&mut w, rg);
    }

    if !meta.key_value_metadata.is_empty() {
        write_key_values(&mut w, 5, &meta.key_value_metadata);
    }
    if let Some(created_by) = &meta.created_by {
        w.string_field(6, created_by);
    }
    w.struct_end();
}

fn write_schema_element(w: &mut CompactWriter<'_>, el: &SchemaElement) {
    w.struct_begin();
    w.opt_i32_field(1, el.physical_type.map(|t| t.as_i32()));
    w.opt_i32_field(2, el.type_length);
    w.opt_i32_field(3, el.repetition.map(|r| r.as_i32()));
    w.string_field(4, &el.name);
    w.opt_i32_field(5, el.num_children);
    w.opt_i32_field(6, el.converted_type.map(|c| c.as_i32()));
    w.opt_i32_field(7, el.scale);
    w.opt_i32_field(8, el.precision);
    w.opt_i32_field(9, el.field_id);
    w.struct_end();
}

fn write_key_values(w: &mut CompactWriter<'_>, id: i16, kvs: &[KeyValue]) {
    w.list_field_begin(id, ctype::STRUCT, kvs.len());
    for kv in kvs {
        w.struct_begin();
        w.string_field(1, &kv.key);
        if let Some(v) = &kv.value {
            w.string_field(2, v);
        }
        w.struct_end();
    }
}

fn write_row_group(w: &mut CompactWriter<'_>, rg: &RowGroupDescriptor) {
    w.struct_begin();
    w.list_field_begin(1, ctype::STRUCT, rg.columns.len());
    for c in &rg.columns {
        write_column_chunk(w, c);
    }
    w.i64_field(2, rg.total_byte_size);
    w.i64_field(3, rg.num_rows);
    w.opt_i64_field(5, rg.file_offset);
    w.opt_i64_field(6, rg.total_compressed_size);
    if let Some(ordinal) = rg.ordinal {
        w.i16_field(7, ordinal);
    }
    w.struct_end();
}

fn write_column_chunk(w: &mut CompactWriter<'_>, c: &ColumnChunkDescriptor) {
    w.struct_begin();
    if let Some(p) = &c.file_path {
        w.string_field(1, p);
    }
    w.i64_field(2, c.file_offset);
    if let Some(md) = &c.meta_data {
        w.struct_field_begin(3);
        write_column_meta_data_fields(w, md);
        w.struct_end();
    }
    w.struct_end();
}

fn write_column_meta_data_fields(w: &mut CompactWriter<'_>, md: &ColumnMetaData) {
    w.i32_field(1, md.physical_type.as_i32());
    w.list_field_begin(2, ctype::I32, md.encodings.len());
    for e in &md.encodings {
        w.write_i32(e.as_i32());
    }
    w.list_field_begin(3, ctype::BINARY, md.path_in_schema.len());
    for p in &md.path_in_schema {
        w.write_binary(p.as_bytes());
    }
    w.i32_field(4, md.codec);
    w.i64_field(5, md.num_values);
    w.i64_field(6, md.total_uncompressed_size);
    w.i64_field(7, md.total_compressed_size);
    w.i64_field(9, md.data_page_offset);
    w.opt_i64_field(10, md.index_page_offset);
    w.opt_i64_field(11, md.dictionary_page_offset);
    if let Some(s) = &md.statistics {
        w.struct_field_begin(12);
        write_statistics_fields(w, s);
        w.struct_end();
    }
}

fn write_statistics_fields(w: &mut CompactWriter<'_>, s: &Statistics) {
    w.opt_binary_field(1, s.max.as_deref());
    w.opt_binary_field(2, s.min.as_deref());
    w.opt_i64_field(3, s.null_count);
    w.opt_i64_field(4, s.distinct_count);
    w.opt_binary_field(5, s.max_value.as_deref());
    w.opt_binary_field(6, s.min_value.as_deref());
}

// --------------------- Page headers ------------------------------------ //

/// Serialise a page header, appending to `out`.
pub(crate) fn write_page_header(h: &PageHeader, out: &mut Vec<u8>) {
    let mut w = CompactWriter::new(out);
    w.struct_begin();
    w.i32_field(1, h.page_type.as_i32());
    w.i32_field(2, h.uncompressed_page_size);
    w.i32_field(3, h.compressed_page_size);
    w.opt_i32_field(4, h.crc);
    if let Some(d) = &h.data_page_header {
        w.struct_field_begin(5);
        write_data_page_header_fields(&mut w, d);
        w.struct_end();
    }
    if let Some(d) = &h.dictionary_page_header {
        w.struct_field_begin(7);
        write_dictionary_page_header_fields(&mut w, d);
        w.struct_end();
    }
    if let Some(d) = &h.data_page_header_v2 {
        w.struct_field_begin(8);
        write_data_page_header_v2_fields(&mut w, d);
        w.struct_end();
    }
    w.struct_end();
}

fn write_data_page_header_fields(w: &mut CompactWriter<'_>, d: &DataPageHeader) {
    w.i32_field(1, d.num_values);
    w.i32_field(2, d.encoding.as_i32());
    w.i32_field(3, d.definition_level_encoding.as_i32());
    w.i32_field(4, d.repetition_level_encoding.as_i32());
    if let Some(s) = &d.statistics {
        w.struct_field_begin(5);
        write_statistics_fields(w, s);
        w.struct_end();
    }
}

fn write_dictionary_page_header_fields(w: &mut CompactWriter<'_>, d: &DictionaryPageHeader) {
    w.i32_field(1, d.num_values);
    w.i32_field(2, d.encoding.as_i32());
    if let Some(sorted) = d.is_sorted {
        w.bool_field(3, sorted);
    }
}

fn write_data_page_header_v2_fields(w: &mut CompactWriter<'_>, d: &DataPageHeaderV2) {
    w.i32_field(1, d.num_values);
    w.i32_field(2, d.num_nulls);
    w.i32_field(3, d.num_rows);
    w.i32_field(4, d.encoding.as_i32());
    w.i32_field(5, d.definition_levels_byte_length);
    w.i32_field(6, d.repetition_levels_byte_length);
    if let Some(c) = d.is_compressed {
        w.bool_field(7, c);
    }
    if let Some(s) = &d.statistics {
        w.struct_field_begin(8);
        write_statistics_fields(w, s);
        w.struct_end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_delta_fits_in_header_nibble() {
        let mut out = Vec::new();
        let mut w = CompactWriter::new(&mut out);
        w.struct_begin();
        w.i32_field(1, 3);
        w.struct_end();
        // delta 1, type I32, zigzag(3) = 6, stop
        assert_eq!(out, vec![0x15, 0x06, 0x00]);
    }

    #[test]
    fn large_field_jump_writes_full_id() {
        let mut out = Vec::new();
        let mut w = CompactWriter::new(&mut out);
        w.struct_begin();
        w.i64_field(20, 1);
        w.struct_end();
        assert_eq!(out, vec![ctype::I64, 40, 2, 0]);
    }

    #[test]
    fn bool_value_lives_in_type_nibble() {
        let mut out = Vec::new();
        let mut w = CompactWriter::new(&mut out);
        w.struct_begin();
        w.bool_field(3, true);
        w.bool_field(4, false);
        w.struct_end();
        assert_eq!(out, vec![0x31, 0x12, 0x00]);
    }

    #[test]
    fn long_list_uses_extended_size() {
        let mut out = Vec::new();
        let mut w = CompactWriter::new(&mut out);
        w.list_begin(ctype::I32, 20);
        assert_eq!(out, vec![0xF5, 20]);
    }
}
