//! # Column Chunk Reader
//!
//! Reads one column chunk back into a [`Column`]: seeks to the chunk start,
//! then alternates page header and payload reads until the chunk's declared
//! number of level slots is decoded. Dictionary entries are resolved as
//! each data page is decoded.

use std::io::SeekFrom;

use log::trace;
use minarrow::Bitmask;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use crate::compression::{Compression, decompress_into, read_page};
use crate::constants::PAGE_HEADER_WINDOW;
use crate::error::{ParquetError, Result};
use crate::models::buffers::BufferPool;
use crate::models::decoders::parquet::{
    decode_bit_packed_levels, decode_dictionary_indices, decode_levels_v1, decode_levels_v2,
};
use crate::models::schema_tree::Levels;
use crate::models::types::column::{Column, ColumnValues};
use crate::models::types::metadata::{ColumnMetaData, PageHeader, SchemaElement};
use crate::models::types::parquet::{Encoding, PageType};
use crate::models::types::schema::DataField;
use crate::options::ParquetOptions;
use crate::traits::metadata_codec::MetadataCodec;
use crate::traits::type_handler::TypeHandler;

const MAX_PAGE_HEADER_WINDOW: usize = 64 * 1024 * 1024;

/// What the reader needs to know about the leaf it decodes.
pub struct ChunkSource<'a> {
    pub element: &'a SchemaElement,
    pub levels: Levels,
    pub handler: &'a dyn TypeHandler,
    pub options: &'a ParquetOptions,
    pub pool: &'a BufferPool,
}

/// Decoded output of all pages so far.
struct Accumulator {
    values: ColumnValues,
    definition: Vec<u32>,
    repetition: Vec<u32>,
    slots: usize,
}

async fn read_page_header<S>(
    stream: &mut S,
    pos: u64,
    codec: &dyn MetadataCodec,
    pool: &BufferPool,
) -> Result<(PageHeader, usize)>
where
    S: AsyncRead + AsyncSeek + Unpin + ?Sized,
{
    let mut window = PAGE_HEADER_WINDOW;
    loop {
        stream.seek(SeekFrom::Start(pos)).await?;
        let mut buf = pool.rent(window);
        let mut filled = 0;
        while filled < window {
            let n = stream.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        match codec.decode_page_header(&buf[..filled]) {
            Err(ParquetError::UnexpectedEof(_)) if filled == window && window < MAX_PAGE_HEADER_WINDOW => {
                window *= 2;
            }
            other => return other,
        }
    }
}

fn decode_v1_levels(
    buf: &[u8],
    encoding: Encoding,
    max_level: u32,
    count: usize,
) -> Result<(Vec<u32>, usize)> {
    if max_level == 0 {
        return Ok((vec![0; count], 0));
    }
    match encoding {
        Encoding::Rle => decode_levels_v1(buf, max_level, count),
        Encoding::BitPacked => decode_bit_packed_levels(buf, max_level, count),
        other => Err(ParquetError::Format(format!("unsupported level encoding {other:?}"))),
    }
}

impl<'a> ChunkSource<'a> {
    fn decode_values(
        &self,
        buf: &[u8],
        encoding: Encoding,
        present: usize,
        dictionary: Option<&ColumnValues>,
    ) -> Result<ColumnValues> {
        if encoding.is_dictionary() {
            let dict = dictionary.ok_or_else(|| {
                ParquetError::Format(format!(
                    "'{}' has a dictionary-encoded page but no dictionary page",
                    self.element.name
                ))
            })?;
            let indices = decode_dictionary_indices(buf, present)?;
            return dict.take_dictionary(&indices);
        }
        match encoding {
            Encoding::Plain => self.handler.decode(buf, present, self.element, self.options),
            other => Err(ParquetError::Format(format!(
                "unsupported value encoding {other:?} in '{}'",
                self.element.name
            ))),
        }
    }

    fn push_page(&self, acc: &mut Accumulator, def: Vec<u32>, rep: Vec<u32>, values: ColumnValues) -> Result<()> {
        acc.slots += def.len().max(rep.len());
        if self.levels.max_definition > 0 {
            acc.definition.extend(def);
        }
        if self.levels.max_repetition > 0 {
            acc.repetition.extend(rep);
        }
        acc.values.append(values)
    }

    fn present_count(&self, def: &[u32], count: usize) -> usize {
        if self.levels.max_definition == 0 {
            count
        } else {
            def.iter().filter(|&&d| d == self.levels.max_definition).count()
        }
    }
}

/// Read the chunk described by `meta` into a column for `field`.
pub async fn read_column_chunk<S>(
    stream: &mut S,
    field: &DataField,
    meta: &ColumnMetaData,
    source: &ChunkSource<'_>,
) -> Result<Column>
where
    S: AsyncRead + AsyncSeek + Unpin + ?Sized,
{
    let codec = meta.compression()?;
    let total = usize::try_from(meta.num_values)
        .map_err(|_| ParquetError::Metadata(format!("negative value count for '{}'", field.path_string())))?;
    let metadata_codec = source.options.metadata_codec.as_ref();
    let levels = source.levels;

    let mut acc = Accumulator {
        values: source.handler.decode(&[], 0, source.element, source.options)?,
        definition: Vec::with_capacity(total),
        repetition: Vec::with_capacity(total),
        slots: 0,
    };
    let mut dictionary: Option<ColumnValues> = None;
    let mut pos = u64::try_from(meta.chunk_start())
        .map_err(|_| ParquetError::Metadata("negative column chunk offset".into()))?;

    while acc.slots < total {
        let (header, consumed) = read_page_header(stream, pos, metadata_codec, source.pool).await?;
        pos += consumed as u64;
        stream.seek(SeekFrom::Start(pos)).await?;
        let compressed = usize::try_from(header.compressed_page_size)
            .map_err(|_| ParquetError::Format("negative page size".into()))?;
        let uncompressed = usize::try_from(header.uncompressed_page_size)
            .map_err(|_| ParquetError::Format("negative page size".into()))?;
        trace!(
            "reading {:?} page of '{}' at {}: {} bytes",
            header.page_type,
            field.path_string(),
            pos,
            compressed
        );

        match header.page_type {
            PageType::DictionaryPage => {
                let dph = header
                    .dictionary_page_header
                    .as_ref()
                    .ok_or_else(|| ParquetError::Format("dictionary page without header".into()))?;
                let buf = read_page(stream, codec, compressed, uncompressed, source.pool).await?;
                let count = dph.num_values.max(0) as usize;
                dictionary = Some(source.handler.decode(&buf, count, source.element, source.options)?);
            }
            PageType::DataPage => {
                let dph = header
                    .data_page_header
                    .as_ref()
                    .ok_or_else(|| ParquetError::Format("data page without header".into()))?;
                let buf = read_page(stream, codec, compressed, uncompressed, source.pool).await?;
                let count = dph.num_values.max(0) as usize;
                let (rep, used_rep) =
                    decode_v1_levels(&buf, dph.repetition_level_encoding, levels.max_repetition, count)?;
                let (def, used_def) = decode_v1_levels(
                    &buf[used_rep..],
                    dph.definition_level_encoding,
                    levels.max_definition,
                    count,
                )?;
                let present = source.present_count(&def, count);
                let values = source.decode_values(&buf[used_rep + used_def..], dph.encoding, present, dictionary.as_ref())?;
                source.push_page(&mut acc, def, rep, values)?;
            }
            PageType::DataPageV2 => {
                let dph = header
                    .data_page_header_v2
                    .as_ref()
                    .ok_or_else(|| ParquetError::Format("data page v2 without header".into()))?;
                let raw = read_page(stream, Compression::None, compressed, compressed, source.pool).await?;
                let count = dph.num_values.max(0) as usize;
                let rep_len = dph.repetition_levels_byte_length.max(0) as usize;
                let def_len = dph.definition_levels_byte_length.max(0) as usize;
                if rep_len + def_len > raw.len() || rep_len + def_len > uncompressed {
                    return Err(ParquetError::Format("v2 level lengths exceed page size".into()));
                }
                let rep = decode_levels_v2(&raw[..rep_len], levels.max_repetition, count)?;
                let def = decode_levels_v2(&raw[rep_len..rep_len + def_len], levels.max_definition, count)?;
                let body = &raw[rep_len + def_len..];
                let present = source.present_count(&def, count);
                let values = if codec != Compression::None && dph.is_compressed.unwrap_or(true) {
                    let mut out = source.pool.rent(uncompressed - rep_len - def_len);
                    decompress_into(codec, body, &mut out)?;
                    source.decode_values(&out, dph.encoding, present, dictionary.as_ref())?
                } else {
                    source.decode_values(body, dph.encoding, present, dictionary.as_ref())?
                };
                source.push_page(&mut acc, def, rep, values)?;
            }
            PageType::IndexPage => {}
        }
        pos += compressed as u64;
    }

    if acc.slots != total {
        return Err(ParquetError::Format(format!(
            "'{}' decoded {} level slots, chunk declares {total}",
            field.path_string(),
            acc.slots
        )));
    }

    Ok(assemble(field.clone(), acc, levels))
}

fn assemble(field: DataField, acc: Accumulator, levels: Levels) -> Column {
    let max_def = levels.max_definition;
    let repetition = (levels.max_repetition > 0).then_some(acc.repetition);
    if max_def == 0 {
        return Column::from_parts(field, acc.values, None, None, repetition);
    }
    let present: Vec<bool> = acc.definition.iter().map(|&d| d == max_def).collect();
    let (values, validity) = if present.iter().all(|&p| p) {
        (acc.values, None)
    } else {
        (acc.values.scatter(&present), Some(Bitmask::from_bools(&present)))
    };
    Column::from_parts(field, values, validity, Some(acc.definition), repetition)
}
