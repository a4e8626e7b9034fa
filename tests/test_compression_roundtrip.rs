//! Compression roundtrip tests
//!
//! These tests write compressed containers and read them back with full
//! value checks, and exercise the page read loop against short reads.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};

use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, ReadBuf};

use lightstream_parquet::compression::{Compression, compress, read_page};
use lightstream_parquet::models::buffers::BufferPool;
use lightstream_parquet::{
    Column, DataField, DataPageVersion, DataType, ParquetError, ParquetFile, ParquetOptions, Schema,
};

/// Create a test schema with multiple data types and 1000 matching rows
fn create_test_data() -> (Schema, Vec<Column>) {
    let n_rows = 1000;
    let schema = Schema::new(vec![
        DataField::new("id", DataType::Int64),
        DataField::new("value", DataType::Double),
        DataField::new("flag", DataType::Boolean),
        DataField::optional("text", DataType::String),
    ]);

    let ids: Vec<i64> = (0..n_rows).map(|i| i as i64 * 2).collect();
    let values: Vec<f64> = (0..n_rows).map(|i| (i as f64) * 3.14159).collect();
    let flags: Vec<bool> = (0..n_rows).map(|i| i % 2 == 0).collect();
    let text: Vec<Option<String>> = (0..n_rows)
        .map(|i| (i % 7 != 0).then(|| format!("test_string_{}", i)))
        .collect();

    let columns = vec![
        Column::new(schema.data_field("id").unwrap(), ids),
        Column::new(schema.data_field("value").unwrap(), values),
        Column::new(schema.data_field("flag").unwrap(), flags),
        Column::from_options(schema.data_field("text").unwrap(), text),
    ];
    (schema, columns)
}

/// Write to a temp file with `options`, read it back and compare every column.
async fn test_codec_roundtrip(options: ParquetOptions) {
    let (schema, columns) = create_test_data();
    let tmp = NamedTempFile::new().unwrap();

    let mut file = ParquetFile::create_path(tmp.path(), schema.clone(), options.clone())
        .await
        .unwrap();
    // Two row groups so the second chunk's offsets depend on compressed sizes.
    file.write_row_group(&columns).await.unwrap();
    file.write_row_group(&columns).await.unwrap();
    file.finalize().await.unwrap();
    drop(file);

    let file = ParquetFile::open_path(tmp.path(), options.clone()).await.unwrap();
    assert_eq!(file.num_rows(), 2000);
    for rg in file.row_groups() {
        let meta = rg.columns()[0].meta_data.as_ref().unwrap();
        assert_eq!(meta.codec, options.compression.as_i32());
        let read = rg.read_all().await.unwrap();
        assert_eq!(read.len(), columns.len());
        for (written, read) in columns.iter().zip(&read) {
            assert_eq!(written.len(), read.len(), "{}", written.field().name);
            assert_eq!(written.null_count(), read.null_count(), "{}", written.field().name);
        }
        assert_eq!(read[0].values(), columns[0].values());
        assert_eq!(read[1].values(), columns[1].values());
        assert_eq!(read[2].values(), columns[2].values());
        assert_eq!(read[3].utf8_options(), columns[3].utf8_options());
    }
}

#[tokio::test]
async fn test_uncompressed_roundtrip() {
    test_codec_roundtrip(ParquetOptions::default()).await;
}

#[cfg(feature = "snappy")]
#[tokio::test]
async fn test_snappy_roundtrip() {
    test_codec_roundtrip(ParquetOptions::default().with_compression(Compression::Snappy)).await;
}

#[cfg(feature = "zstd")]
#[tokio::test]
async fn test_zstd_roundtrip() {
    test_codec_roundtrip(
        ParquetOptions::default()
            .with_compression(Compression::Zstd)
            .with_compression_level(3),
    )
    .await;
}

#[cfg(feature = "gzip")]
#[tokio::test]
async fn test_gzip_roundtrip() {
    test_codec_roundtrip(ParquetOptions::default().with_compression(Compression::Gzip)).await;
}

#[cfg(feature = "brotli")]
#[tokio::test]
async fn test_brotli_roundtrip() {
    test_codec_roundtrip(ParquetOptions::default().with_compression(Compression::Brotli)).await;
}

#[cfg(feature = "lz4")]
#[tokio::test]
async fn test_lz4_raw_v2_roundtrip() {
    test_codec_roundtrip(
        ParquetOptions::default()
            .with_compression(Compression::Lz4Raw)
            .with_data_page_version(DataPageVersion::V2)
            .with_page_row_limit(128),
    )
    .await;
}

#[tokio::test]
async fn test_unsupported_codec_fails_on_write() {
    let (schema, columns) = create_test_data();
    let options = ParquetOptions::default().with_compression(Compression::Lzo);
    let mut file = ParquetFile::create(Cursor::new(Vec::new()), schema, options)
        .await
        .unwrap();
    let err = file.write_row_group(&columns).await.unwrap_err();
    assert!(matches!(err, ParquetError::UnsupportedCodec(_)));
}

/// Yields at most `step` bytes per read.
struct Trickle {
    data: Vec<u8>,
    pos: usize,
    step: usize,
}

impl AsyncRead for Trickle {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let end = (self.pos + self.step).min(self.data.len());
        let n = (end - self.pos).min(buf.remaining());
        let start = self.pos;
        buf.put_slice(&self.data[start..start + n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_read_page_retries_short_reads() {
    let input: Vec<u8> = (0..500u32).flat_map(|i| (i % 11).to_le_bytes()).collect();
    let pool = BufferPool::new();
    let mut source = Trickle {
        data: input.clone(),
        pos: 0,
        step: 3,
    };
    let page = read_page(&mut source, Compression::None, input.len(), input.len(), &pool)
        .await
        .unwrap();
    assert_eq!(&page[..], input.as_slice());
    drop(page);
    assert_eq!(pool.outstanding(), 0);
}

#[cfg(feature = "snappy")]
#[tokio::test]
async fn test_read_page_decompresses_after_short_reads() {
    let input: Vec<u8> = (0..500u32).flat_map(|i| (i % 11).to_le_bytes()).collect();
    let packed = compress(&input, Compression::Snappy, None).unwrap();
    let pool = BufferPool::new();
    let mut source = Trickle {
        data: packed.clone(),
        pos: 0,
        step: 5,
    };
    let page = read_page(&mut source, Compression::Snappy, packed.len(), input.len(), &pool)
        .await
        .unwrap();
    assert_eq!(&page[..], input.as_slice());
    drop(page);
    assert_eq!(pool.outstanding(), 0);
}

#[tokio::test]
async fn test_read_page_under_read() {
    let pool = BufferPool::new();
    let mut source = Trickle {
        data: vec![1u8; 10],
        pos: 0,
        step: 4,
    };
    let err = read_page(&mut source, Compression::None, 16, 16, &pool)
        .await
        .unwrap_err();
    match err {
        ParquetError::UnderRead { expected, actual } => {
            assert_eq!(expected, 16);
            assert_eq!(actual, 10);
        }
        other => panic!("expected UnderRead, got {other:?}"),
    }
    assert_eq!(pool.outstanding(), 0);
}

#[cfg(feature = "snappy")]
#[tokio::test]
async fn test_read_page_releases_buffer_on_decode_failure() {
    let pool = BufferPool::new();
    let mut source = Trickle {
        data: vec![0xFF; 32],
        pos: 0,
        step: 32,
    };
    let result = read_page(&mut source, Compression::Snappy, 32, 64, &pool).await;
    assert!(result.is_err());
    assert_eq!(pool.outstanding(), 0);
    assert!(pool.available() >= 1);
}
