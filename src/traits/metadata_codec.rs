use std::fmt::Debug;

use crate::error::Result;
use crate::models::types::metadata::{FileMetaData, PageHeader};

/// Serialises the footer descriptor tree and page headers.
///
/// The container only knows the footer's byte length and position; everything
/// inside those bytes belongs to the codec. The column pipeline uses the
/// page-header half to frame each page.
pub trait MetadataCodec: Debug + Send + Sync {
    fn encode_file_metadata(&self, meta: &FileMetaData) -> Result<Vec<u8>>;

    fn decode_file_metadata(&self, bytes: &[u8]) -> Result<FileMetaData>;

    /// Append the encoded header to `out`.
    fn encode_page_header(&self, header: &PageHeader, out: &mut Vec<u8>) -> Result<()>;

    /// Decode a header from the front of `bytes`, returning the bytes consumed.
    ///
    /// Must fail with [`crate::error::ParquetError::UnexpectedEof`] when `bytes`
    /// ends before the header does, so callers can retry with a wider window.
    fn decode_page_header(&self, bytes: &[u8]) -> Result<(PageHeader, usize)>;
}
