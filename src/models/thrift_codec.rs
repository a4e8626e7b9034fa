//! Default [`MetadataCodec`]: Thrift Compact Protocol, as used by every
//! Parquet producer.

use crate::error::Result;
use crate::models::decoders::thrift::{read_file_metadata, read_page_header};
use crate::models::encoders::parquet::metadata::{write_file_metadata, write_page_header};
use crate::models::types::metadata::{FileMetaData, PageHeader};
use crate::traits::metadata_codec::MetadataCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct ThriftCompactCodec;

impl MetadataCodec for ThriftCompactCodec {
    fn encode_file_metadata(&self, meta: &FileMetaData) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(256);
        write_file_metadata(meta, &mut out);
        Ok(out)
    }

    fn decode_file_metadata(&self, bytes: &[u8]) -> Result<FileMetaData> {
        read_file_metadata(bytes)
    }

    fn encode_page_header(&self, header: &PageHeader, out: &mut Vec<u8>) -> Result<()> {
        write_page_header(header, out);
        Ok(())
    }

    fn decode_page_header(&self, bytes: &[u8]) -> Result<(PageHeader, usize)> {
        read_page_header(bytes)
    }
}
