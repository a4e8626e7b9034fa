//! # Column Chunk Writer
//!
//! Turns one in-memory [`Column`] into the bytes of a column chunk: an
//! optional dictionary page followed by one or more data pages, each led by
//! its page header. Everything is encoded in memory before the caller
//! touches the stream, so validation and encoding failures never leave
//! partial bytes behind.

use std::borrow::Cow;

use log::trace;

use crate::compression::{Compression, PageCompressor, compressor_for};
use crate::enums::DataPageVersion;
use crate::error::{ParquetError, Result};
use crate::models::encoders::parquet::data::{
    build_dictionary, encode_dictionary_indices, encode_levels_v1, encode_levels_v2,
};
use crate::models::encoders::parquet::statistics::compute_statistics;
use crate::models::schema_tree::Levels;
use crate::models::types::column::{Column, ColumnValues};
use crate::models::types::metadata::{
    ColumnChunkDescriptor, ColumnMetaData, DataPageHeader, DataPageHeaderV2, DictionaryPageHeader,
    PageHeader, SchemaElement,
};
use crate::models::types::parquet::{Encoding, PageType, PhysicalType};
use crate::options::ParquetOptions;
use crate::traits::type_handler::TypeHandler;

/// A fully encoded column chunk, ready to be written at `descriptor.file_offset`.
#[derive(Debug)]
pub struct EncodedChunk {
    pub bytes: Vec<u8>,
    pub descriptor: ColumnChunkDescriptor,
    pub num_rows: usize,
}

/// Where a column chunk goes and how its values are encoded.
pub struct ChunkTarget<'a> {
    pub element: &'a SchemaElement,
    pub path: &'a [String],
    pub levels: Levels,
    pub handler: &'a dyn TypeHandler,
    pub options: &'a ParquetOptions,
}

/// Validated levels and the dense present values of a column.
struct Prepared<'a> {
    definition: Option<Cow<'a, [u32]>>,
    repetition: Option<&'a [u32]>,
    dense: Cow<'a, ColumnValues>,
    num_rows: usize,
}

fn invalid(column: &Column, msg: impl std::fmt::Display) -> ParquetError {
    ParquetError::InvalidColumn(format!("'{}': {msg}", column.field().path_string()))
}

fn check_levels(column: &Column, levels: &[u32], max: u32, what: &str) -> Result<()> {
    if levels.len() != column.len() {
        return Err(invalid(
            column,
            format!("{} {what} levels for {} values", levels.len(), column.len()),
        ));
    }
    if let Some(bad) = levels.iter().find(|&&l| l > max) {
        return Err(invalid(column, format!("{what} level {bad} exceeds maximum {max}")));
    }
    Ok(())
}

fn prepare<'a>(column: &'a Column, levels: Levels) -> Result<Prepared<'a>> {
    let n = column.len();

    let repetition = match (column.repetition_levels(), levels.max_repetition) {
        (None, 0) => None,
        (Some(r), 0) => {
            if r.iter().any(|&l| l != 0) {
                return Err(invalid(column, "repetition levels on a non-repeated column"));
            }
            None
        }
        (None, _) if n == 0 => None,
        (None, max) => {
            return Err(invalid(column, format!("repetition levels required (max level {max})")));
        }
        (Some(r), max) => {
            check_levels(column, r, max, "repetition")?;
            if r.first().is_some_and(|&l| l != 0) {
                return Err(invalid(column, "first repetition level must be 0"));
            }
            Some(r)
        }
    };

    let max_def = levels.max_definition;
    let definition: Option<Cow<'a, [u32]>> = match column.definition_levels() {
        Some(d) => {
            check_levels(column, d, max_def, "definition")?;
            (max_def > 0).then_some(Cow::Borrowed(d))
        }
        None if max_def == 0 => {
            if column.null_count() > 0 {
                return Err(invalid(column, "null value in a required column"));
            }
            None
        }
        None => Some(Cow::Owned(
            (0..n)
                .map(|i| if column.is_null(i) { max_def - 1 } else { max_def })
                .collect(),
        )),
    };

    let dense = match &definition {
        Some(d) if d.iter().any(|&l| l != max_def) => {
            let present: Vec<usize> = (0..n).filter(|&i| d[i] == max_def).collect();
            Cow::Owned(column.values().gather(&present))
        }
        _ => Cow::Borrowed(column.values()),
    };

    let num_rows = repetition.map_or(n, |r| r.iter().filter(|&&l| l == 0).count());
    Ok(Prepared {
        definition,
        repetition,
        dense,
        num_rows,
    })
}

/// Slot ranges per data page. Pages only start at record boundaries.
fn page_ranges(repetition: Option<&[u32]>, n: usize, limit: usize) -> Vec<(usize, usize)> {
    if n == 0 {
        return vec![(0, 0)];
    }
    let limit = limit.max(1);
    let mut out = Vec::new();
    let mut start = 0;
    while start < n {
        let mut end = (start + limit).min(n);
        if let Some(r) = repetition {
            while end < n && r[end] != 0 {
                end += 1;
            }
        }
        out.push((start, end));
        start = end;
    }
    out
}

struct PageSink<'a> {
    bytes: Vec<u8>,
    uncompressed_total: usize,
    compressor: Box<dyn PageCompressor>,
    target: &'a ChunkTarget<'a>,
}

impl PageSink<'_> {
    fn push(&mut self, header: &PageHeader, payload: &[u8]) -> Result<()> {
        let before = self.bytes.len();
        self.target
            .options
            .metadata_codec
            .encode_page_header(header, &mut self.bytes)?;
        let header_len = self.bytes.len() - before;
        self.bytes.extend_from_slice(payload);
        self.uncompressed_total += header_len + header.uncompressed_page_size as usize;
        trace!(
            "wrote {:?} page for '{}': {} -> {} bytes",
            header.page_type,
            self.target.element.name,
            header.uncompressed_page_size,
            header.compressed_page_size
        );
        Ok(())
    }

    fn compress(&mut self, raw: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(raw.len());
        self.compressor.compress(raw, &mut out)?;
        Ok(out)
    }
}

/// Encode `column` as a column chunk starting at `start_offset`.
///
/// # Errors
/// [`ParquetError::InvalidColumn`] when levels, nulls or values do not fit
/// the target element; codec errors from compression.
pub fn encode_column_chunk(column: &Column, target: &ChunkTarget<'_>, start_offset: u64) -> Result<EncodedChunk> {
    let options = target.options;
    let levels = target.levels;
    let prepared = prepare(column, levels)?;
    let n = column.len();

    let dictionary = if options.dictionary_enabled
        && target.element.physical_type == Some(PhysicalType::ByteArray)
    {
        build_dictionary(&prepared.dense)
    } else {
        None
    };

    let mut sink = PageSink {
        bytes: Vec::new(),
        uncompressed_total: 0,
        compressor: compressor_for(options.compression, options.compression_level)?,
        target,
    };
    let mut encodings = vec![Encoding::Plain];
    if levels.max_definition > 0 || levels.max_repetition > 0 {
        encodings.push(Encoding::Rle);
    }

    let mut dictionary_page_offset = None;
    if let Some(dict) = &dictionary {
        let mut raw = Vec::new();
        target.handler.encode(&dict.dictionary, target.element, &mut raw)?;
        let compressed = sink.compress(&raw)?;
        let mut header = PageHeader::new(PageType::DictionaryPage, raw.len(), compressed.len());
        header.dictionary_page_header = Some(DictionaryPageHeader {
            num_values: dict.dictionary.len() as i32,
            encoding: Encoding::Plain,
            is_sorted: Some(false),
        });
        dictionary_page_offset = Some(start_offset as i64);
        sink.push(&header, &compressed)?;
        encodings.push(Encoding::RleDictionary);
    }
    let data_page_offset = start_offset as i64 + sink.bytes.len() as i64;
    let value_encoding = if dictionary.is_some() { Encoding::RleDictionary } else { Encoding::Plain };

    let max_def = levels.max_definition;
    let mut dense_pos = 0;
    for (start, end) in page_ranges(prepared.repetition, n, options.page_row_limit) {
        let def = prepared.definition.as_deref().map(|d| &d[start..end]);
        let rep = prepared.repetition.map(|r| &r[start..end]);
        let present = def.map_or(end - start, |d| d.iter().filter(|&&l| l == max_def).count());
        let nulls = (end - start) - present;
        let page_rows = rep.map_or(end - start, |r| r.iter().filter(|&&l| l == 0).count());

        let page_values = prepared.dense.slice(dense_pos, dense_pos + present);
        let mut values = Vec::new();
        match &dictionary {
            Some(dict) => encode_dictionary_indices(&dict.indices[dense_pos..dense_pos + present], &mut values),
            None => target.handler.encode(&page_values, target.element, &mut values)?,
        }
        let stats = compute_statistics(&page_values, nulls, target.element);
        dense_pos += present;

        match options.data_page_version {
            DataPageVersion::V1 => {
                let mut raw = Vec::with_capacity(values.len() + 16);
                if let Some(r) = rep {
                    encode_levels_v1(r, levels.max_repetition, &mut raw);
                }
                if let Some(d) = def {
                    encode_levels_v1(d, max_def, &mut raw);
                }
                raw.extend_from_slice(&values);
                let compressed = sink.compress(&raw)?;
                let mut header = PageHeader::new(PageType::DataPage, raw.len(), compressed.len());
                header.data_page_header = Some(DataPageHeader {
                    num_values: (end - start) as i32,
                    encoding: value_encoding,
                    definition_level_encoding: Encoding::Rle,
                    repetition_level_encoding: Encoding::Rle,
                    statistics: Some(stats),
                });
                sink.push(&header, &compressed)?;
            }
            DataPageVersion::V2 => {
                let mut rep_bytes = Vec::new();
                if let Some(r) = rep {
                    encode_levels_v2(r, levels.max_repetition, &mut rep_bytes);
                }
                let mut def_bytes = Vec::new();
                if let Some(d) = def {
                    encode_levels_v2(d, max_def, &mut def_bytes);
                }
                let compressed = sink.compress(&values)?;
                let levels_len = rep_bytes.len() + def_bytes.len();
                let mut header = PageHeader::new(
                    PageType::DataPageV2,
                    levels_len + values.len(),
                    levels_len + compressed.len(),
                );
                header.data_page_header_v2 = Some(DataPageHeaderV2 {
                    num_values: (end - start) as i32,
                    num_nulls: nulls as i32,
                    num_rows: page_rows as i32,
                    encoding: value_encoding,
                    definition_levels_byte_length: def_bytes.len() as i32,
                    repetition_levels_byte_length: rep_bytes.len() as i32,
                    is_compressed: Some(sink.compressor.codec() != Compression::None),
                    statistics: Some(stats),
                });
                let mut payload = rep_bytes;
                payload.extend_from_slice(&def_bytes);
                payload.extend_from_slice(&compressed);
                sink.push(&header, &payload)?;
            }
        }
    }

    let null_count = n - prepared.dense.len();
    let statistics = compute_statistics(&prepared.dense, null_count, target.element);
    let total_compressed = sink.bytes.len() as i64;
    let meta = ColumnMetaData {
        physical_type: target.element.physical_type.ok_or_else(|| {
            ParquetError::Internal(format!("'{}' is not a leaf element", target.element.name))
        })?,
        encodings,
        path_in_schema: target.path.to_vec(),
        codec: options.compression.as_i32(),
        num_values: n as i64,
        total_uncompressed_size: sink.uncompressed_total as i64,
        total_compressed_size: total_compressed,
        data_page_offset,
        index_page_offset: None,
        dictionary_page_offset,
        statistics: Some(statistics),
    };

    Ok(EncodedChunk {
        bytes: sink.bytes,
        descriptor: ColumnChunkDescriptor {
            file_path: None,
            file_offset: start_offset as i64,
            meta_data: Some(meta),
        },
        num_rows: prepared.num_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::handlers::{LeafKind, PrimitiveHandler};
    use crate::models::types::parquet::Repetition;
    use crate::models::types::schema::{DataField, DataType};

    fn target<'a>(
        element: &'a SchemaElement,
        path: &'a [String],
        levels: Levels,
        handler: &'a PrimitiveHandler,
        options: &'a ParquetOptions,
    ) -> ChunkTarget<'a> {
        ChunkTarget {
            element,
            path,
            levels,
            handler,
            options,
        }
    }

    #[test]
    fn page_ranges_respect_record_boundaries() {
        let rep = [0, 1, 1, 0, 1, 0, 0];
        assert_eq!(page_ranges(Some(&rep), 7, 2), vec![(0, 3), (3, 5), (5, 7)]);
        assert_eq!(page_ranges(None, 5, 2), vec![(0, 2), (2, 4), (4, 5)]);
        assert_eq!(page_ranges(None, 0, 2), vec![(0, 0)]);
    }

    #[test]
    fn null_in_required_column_is_rejected() {
        let el = SchemaElement::leaf("id", PhysicalType::Int32, Repetition::Required);
        let path = vec!["id".to_string()];
        let h = PrimitiveHandler::new(LeafKind::Int32);
        let opts = ParquetOptions::default();
        let col = Column::from_options(DataField::new("id", DataType::Int32), vec![Some(1), None]);
        let err = encode_column_chunk(&col, &target(&el, &path, Levels::default(), &h, &opts), 4).unwrap_err();
        assert!(matches!(err, ParquetError::InvalidColumn(_)));
    }

    #[test]
    fn repeated_column_needs_repetition_levels() {
        let el = SchemaElement::leaf("x", PhysicalType::Int32, Repetition::Repeated);
        let path = vec!["x".to_string()];
        let h = PrimitiveHandler::new(LeafKind::Int32);
        let opts = ParquetOptions::default();
        let levels = Levels { max_repetition: 1, max_definition: 1 };
        let col = Column::new(DataField::new("x", DataType::Int32).with_repeated(true), vec![1, 2]);
        assert!(encode_column_chunk(&col, &target(&el, &path, levels, &h, &opts), 4).is_err());

        let bad_start = col.clone().with_repetition_levels(vec![1, 0]);
        assert!(encode_column_chunk(&bad_start, &target(&el, &path, levels, &h, &opts), 4).is_err());

        let ok = col.with_repetition_levels(vec![0, 1]);
        let chunk = encode_column_chunk(&ok, &target(&el, &path, levels, &h, &opts), 4).unwrap();
        assert_eq!(chunk.num_rows, 1);
    }

    #[test]
    fn descriptor_accounts_for_every_byte() {
        let el = SchemaElement::leaf("s", PhysicalType::ByteArray, Repetition::Optional);
        let path = vec!["s".to_string()];
        let h = PrimitiveHandler::new(LeafKind::Binary);
        let opts = ParquetOptions::default().with_page_row_limit(3);
        let col = Column::from_options(
            DataField::optional("s", DataType::Binary),
            vec![Some(b"a".to_vec()), None, Some(b"a".to_vec()), Some(b"b".to_vec()), Some(b"a".to_vec())],
        );
        let levels = Levels { max_repetition: 0, max_definition: 1 };
        let chunk = encode_column_chunk(&col, &target(&el, &path, levels, &h, &opts), 100).unwrap();
        let meta = chunk.descriptor.meta_data.unwrap();
        assert_eq!(meta.total_compressed_size as usize, chunk.bytes.len());
        assert_eq!(meta.num_values, 5);
        assert_eq!(meta.dictionary_page_offset, Some(100));
        assert!(meta.data_page_offset > 100);
        assert!(meta.encodings.contains(&Encoding::RleDictionary));
        assert_eq!(meta.statistics.unwrap().null_count, Some(1));
        assert_eq!(chunk.num_rows, 5);
    }
}
