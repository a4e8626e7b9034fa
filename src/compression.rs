//! # Page Compression
//!
//! Codec dispatch for page payloads.
//! - Snappy via `snap` (raw blocks, as Parquet stores them).
//! - Gzip via `flate2`, Brotli via `brotli`, Zstd via `zstd`, LZ4_RAW via `lz4_flex`.
//! - Each codec sits behind its own cargo feature; a codec that is known to the
//!   format but not compiled in yields [`ParquetError::UnsupportedCodec`].
//!
//! [`read_page`] is the single entry point used by the column reader: it pulls
//! exactly `compressed_len` bytes from the stream, retrying short reads, then
//! decodes into a pooled buffer of exactly `uncompressed_len` bytes.

#[cfg(any(feature = "gzip", feature = "brotli", feature = "zstd"))]
use std::io::Read;
#[cfg(any(feature = "gzip", feature = "brotli"))]
use std::io::Write;

use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ParquetError, Result};
use crate::models::buffers::{BufferPool, PooledBuffer};

/// Parquet compression codecs, with `parquet.thrift` ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    #[default]
    None,
    Snappy,
    Gzip,
    Lzo,
    Brotli,
    /// Hadoop-framed LZ4 (deprecated in the format).
    Lz4,
    Zstd,
    Lz4Raw,
}

impl Compression {
    pub fn as_i32(self) -> i32 {
        match self {
            Compression::None => 0,
            Compression::Snappy => 1,
            Compression::Gzip => 2,
            Compression::Lzo => 3,
            Compression::Brotli => 4,
            Compression::Lz4 => 5,
            Compression::Zstd => 6,
            Compression::Lz4Raw => 7,
        }
    }

    /// Map a codec id from a column chunk. Unknown ids fail.
    pub fn from_i32(id: i32) -> Result<Self> {
        Ok(match id {
            0 => Compression::None,
            1 => Compression::Snappy,
            2 => Compression::Gzip,
            3 => Compression::Lzo,
            4 => Compression::Brotli,
            5 => Compression::Lz4,
            6 => Compression::Zstd,
            7 => Compression::Lz4Raw,
            other => return Err(ParquetError::UnsupportedCodec(format!("codec id {other}"))),
        })
    }
}

/// Returns the codec as a Parquet-format string identifier.
pub fn parquet_codec_name(codec: Compression) -> &'static str {
    match codec {
        Compression::None => "UNCOMPRESSED",
        Compression::Snappy => "SNAPPY",
        Compression::Gzip => "GZIP",
        Compression::Lzo => "LZO",
        Compression::Brotli => "BROTLI",
        Compression::Lz4 => "LZ4",
        Compression::Zstd => "ZSTD",
        Compression::Lz4Raw => "LZ4_RAW",
    }
}

/// A page-level compression transform.
pub trait PageCompressor: Send {
    fn codec(&self) -> Compression;

    /// Compress `input`, appending to `out`.
    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()>;
}

/// Build the compressor for `codec` at `level` (codec default when `None`).
///
/// # Errors
/// [`ParquetError::UnsupportedCodec`] if the codec is unknown to this build.
pub fn compressor_for(codec: Compression, level: Option<i32>) -> Result<Box<dyn PageCompressor>> {
    match codec {
        Compression::None => Ok(Box::new(Identity)),
        #[cfg(feature = "snappy")]
        Compression::Snappy => Ok(Box::new(SnappyCompressor {
            encoder: snap::raw::Encoder::new(),
        })),
        #[cfg(feature = "gzip")]
        Compression::Gzip => Ok(Box::new(GzipCompressor {
            level: gzip_level(level),
        })),
        #[cfg(feature = "brotli")]
        Compression::Brotli => Ok(Box::new(BrotliCompressor {
            quality: level.unwrap_or(1).clamp(0, 11) as u32,
        })),
        #[cfg(feature = "zstd")]
        Compression::Zstd => Ok(Box::new(ZstdCompressor {
            // Level 1 is fastest, with good compression.
            level: level.unwrap_or(1),
        })),
        #[cfg(feature = "lz4")]
        Compression::Lz4Raw => Ok(Box::new(Lz4RawCompressor)),
        other => Err(unsupported(other)),
    }
}

fn unsupported(codec: Compression) -> ParquetError {
    ParquetError::UnsupportedCodec(format!(
        "{} is not available in this build",
        parquet_codec_name(codec)
    ))
}

/// Compress a buffer according to the requested codec.
pub fn compress(input: &[u8], codec: Compression, level: Option<i32>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    compressor_for(codec, level)?.compress(input, &mut out)?;
    Ok(out)
}

struct Identity;

impl PageCompressor for Identity {
    fn codec(&self) -> Compression {
        Compression::None
    }

    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(input);
        Ok(())
    }
}

#[cfg(feature = "snappy")]
struct SnappyCompressor {
    encoder: snap::raw::Encoder,
}

#[cfg(feature = "snappy")]
impl PageCompressor for SnappyCompressor {
    fn codec(&self) -> Compression {
        Compression::Snappy
    }

    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        out.resize(start + snap::raw::max_compress_len(input.len()), 0);
        let n = self.encoder.compress(input, &mut out[start..])?;
        out.truncate(start + n);
        Ok(())
    }
}

/// 0 stores, 1 favours speed, anything else uses the default level.
#[cfg(feature = "gzip")]
fn gzip_level(level: Option<i32>) -> flate2::Compression {
    match level {
        Some(0) => flate2::Compression::none(),
        Some(1) => flate2::Compression::fast(),
        _ => flate2::Compression::default(),
    }
}

#[cfg(feature = "gzip")]
struct GzipCompressor {
    level: flate2::Compression,
}

#[cfg(feature = "gzip")]
impl PageCompressor for GzipCompressor {
    fn codec(&self) -> Compression {
        Compression::Gzip
    }

    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let mut enc = flate2::write::GzEncoder::new(out, self.level);
        enc.write_all(input)?;
        enc.finish()?;
        Ok(())
    }
}

#[cfg(feature = "brotli")]
struct BrotliCompressor {
    quality: u32,
}

#[cfg(feature = "brotli")]
impl PageCompressor for BrotliCompressor {
    fn codec(&self) -> Compression {
        Compression::Brotli
    }

    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let mut w = brotli::CompressorWriter::new(out, 4096, self.quality, 22);
        w.write_all(input)?;
        // finishes the brotli stream
        w.into_inner();
        Ok(())
    }
}

#[cfg(feature = "zstd")]
struct ZstdCompressor {
    level: i32,
}

#[cfg(feature = "zstd")]
impl PageCompressor for ZstdCompressor {
    fn codec(&self) -> Compression {
        Compression::Zstd
    }

    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        let encoded = zstd::stream::encode_all(input, self.level)
            .map_err(|e| ParquetError::Compression(format!("Zstd: {e}")))?;
        out.extend_from_slice(&encoded);
        Ok(())
    }
}

#[cfg(feature = "lz4")]
struct Lz4RawCompressor;

#[cfg(feature = "lz4")]
impl PageCompressor for Lz4RawCompressor {
    fn codec(&self) -> Compression {
        Compression::Lz4Raw
    }

    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&lz4_flex::block::compress(input));
        Ok(())
    }
}

/// Decode `input` into `out`, which must be sized to the exact uncompressed length.
///
/// # Errors
/// [`ParquetError::Compression`] if the codec fails or yields a different length.
pub fn decompress_into(codec: Compression, input: &[u8], out: &mut [u8]) -> Result<()> {
    let expected = out.len();
    let produced = match codec {
        Compression::None => {
            if input.len() != expected {
                return Err(length_mismatch(codec, expected, input.len()));
            }
            out.copy_from_slice(input);
            expected
        }
        #[cfg(feature = "snappy")]
        Compression::Snappy => snap::raw::Decoder::new().decompress(input, out)?,
        #[cfg(feature = "gzip")]
        Compression::Gzip => read_exactly(codec, flate2::read::GzDecoder::new(input), out)?,
        #[cfg(feature = "brotli")]
        Compression::Brotli => read_exactly(codec, brotli::Decompressor::new(input, 4096), out)?,
        #[cfg(feature = "zstd")]
        Compression::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(input)
                .map_err(|e| ParquetError::Compression(format!("Zstd: {e}")))?;
            read_exactly(codec, decoder, out)?
        }
        #[cfg(feature = "lz4")]
        Compression::Lz4Raw => lz4_flex::block::decompress_into(input, out)
            .map_err(|e| ParquetError::Compression(format!("LZ4_RAW: {e}")))?,
        other => return Err(unsupported(other)),
    };
    if produced != expected {
        return Err(length_mismatch(codec, expected, produced));
    }
    Ok(())
}

/// Decompress a buffer according to the codec into a new `Vec<u8>`.
pub fn decompress(input: &[u8], codec: Compression, uncompressed_len: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; uncompressed_len];
    decompress_into(codec, input, &mut out)?;
    Ok(out)
}

/// Fill `out` from a streaming decoder, then require the stream to be exhausted.
#[cfg(any(feature = "gzip", feature = "brotli", feature = "zstd"))]
fn read_exactly<R: Read>(codec: Compression, mut r: R, out: &mut [u8]) -> Result<usize> {
    let codec_err = |e: std::io::Error| {
        ParquetError::Compression(format!("{}: {e}", parquet_codec_name(codec)))
    };
    r.read_exact(out).map_err(codec_err)?;
    let mut extra = [0u8; 64];
    let mut surplus = 0;
    loop {
        let n = r.read(&mut extra).map_err(codec_err)?;
        if n == 0 {
            break;
        }
        surplus += n;
    }
    if surplus > 0 {
        return Err(length_mismatch(codec, out.len(), out.len() + surplus));
    }
    Ok(out.len())
}

fn length_mismatch(codec: Compression, expected: usize, actual: usize) -> ParquetError {
    ParquetError::Compression(format!(
        "{} produced {actual} bytes, page header declared {expected}",
        parquet_codec_name(codec)
    ))
}

/// Read one page payload of `compressed_len` bytes and decode it.
///
/// Short reads are retried until the full length arrives or the source
/// returns zero bytes, in which case [`ParquetError::UnderRead`] reports
/// both counts. The compressed buffer is a pooled guard, so it goes back
/// to `pool` on every path including decode failure.
pub async fn read_page<R>(
    source: &mut R,
    codec: Compression,
    compressed_len: usize,
    uncompressed_len: usize,
    pool: &BufferPool,
) -> Result<PooledBuffer>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut raw = pool.rent(compressed_len);
    let mut total = 0;
    while total < compressed_len {
        let n = source.read(&mut raw[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
    }
    if total != compressed_len {
        return Err(ParquetError::UnderRead {
            expected: compressed_len,
            actual: total,
        });
    }
    trace!(
        "read page: {} bytes {} -> {} bytes",
        compressed_len,
        parquet_codec_name(codec),
        uncompressed_len
    );

    if codec == Compression::None {
        return Ok(raw);
    }

    let mut decoded = pool.rent(uncompressed_len);
    decompress_into(codec, &raw, &mut decoded)?;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut v = Vec::new();
        for i in 0..2000u32 {
            v.extend_from_slice(&(i % 17).to_le_bytes());
        }
        v
    }

    fn roundtrip(codec: Compression) {
        let input = sample();
        let packed = compress(&input, codec, None).unwrap();
        let out = decompress(&packed, codec, input.len()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn none_is_identity() {
        let packed = compress(b"abc", Compression::None, None).unwrap();
        assert_eq!(packed, b"abc");
    }

    #[cfg(feature = "snappy")]
    #[test]
    fn snappy_roundtrip() {
        roundtrip(Compression::Snappy);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_roundtrip() {
        roundtrip(Compression::Gzip);
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn brotli_roundtrip() {
        roundtrip(Compression::Brotli);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_roundtrip() {
        roundtrip(Compression::Zstd);
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn lz4_raw_roundtrip() {
        roundtrip(Compression::Lz4Raw);
    }

    #[test]
    fn lzo_is_unsupported() {
        assert!(matches!(
            compressor_for(Compression::Lzo, None),
            Err(ParquetError::UnsupportedCodec(_))
        ));
    }

    #[test]
    fn unknown_codec_id_is_unsupported() {
        assert!(matches!(
            Compression::from_i32(99),
            Err(ParquetError::UnsupportedCodec(_))
        ));
    }

    #[cfg(feature = "snappy")]
    #[test]
    fn wrong_uncompressed_length_fails() {
        let input = sample();
        let packed = compress(&input, Compression::Snappy, None).unwrap();
        assert!(decompress(&packed, Compression::Snappy, input.len() + 1).is_err());
    }

    #[cfg(any(feature = "gzip", feature = "brotli", feature = "zstd"))]
    fn assert_surplus_rejected(codec: Compression) {
        let input = vec![7u8; 1000];
        let packed = compress(&input, codec, None).unwrap();
        match decompress(&packed, codec, 500) {
            Err(ParquetError::Compression(msg)) => assert!(msg.contains("1000"), "{msg}"),
            other => panic!("expected a length mismatch, got {other:?}"),
        }
        assert!(decompress(&packed, codec, 1001).is_err());
        assert_eq!(decompress(&packed, codec, 1000).unwrap(), input);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_longer_than_declared_fails() {
        assert_surplus_rejected(Compression::Gzip);
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn brotli_longer_than_declared_fails() {
        assert_surplus_rejected(Compression::Brotli);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_longer_than_declared_fails() {
        assert_surplus_rejected(Compression::Zstd);
    }
}
