//! # Container Options
//!
//! Knobs shared by every reader and writer of one container. Construct with
//! [`ParquetOptions::default`] and adjust through the `with_*` builders.

use std::sync::Arc;

use crate::compression::Compression;
use crate::constants::{DEFAULT_CREATED_BY, DEFAULT_PAGE_ROW_LIMIT};
use crate::enums::DataPageVersion;
use crate::models::handlers::TypeRegistry;
use crate::models::thrift_codec::ThriftCompactCodec;
use crate::traits::metadata_codec::MetadataCodec;

#[derive(Debug, Clone)]
pub struct ParquetOptions {
    /// Codec for every column chunk written.
    pub compression: Compression,
    /// Codec-specific level; `None` uses the codec default.
    pub compression_level: Option<i32>,
    pub data_page_version: DataPageVersion,
    /// Maximum level slots per data page. Pages are extended to the next
    /// record boundary for repeated columns.
    pub page_row_limit: usize,
    /// Dictionary-encode string and binary chunks with enough repetition.
    pub dictionary_enabled: bool,
    /// Read un-annotated BYTE_ARRAY columns as strings.
    pub treat_byte_array_as_string: bool,
    /// Read INT96 columns as millisecond timestamps instead of raw bytes.
    pub treat_big_integers_as_dates: bool,
    pub created_by: String,
    pub registry: Arc<TypeRegistry>,
    pub metadata_codec: Arc<dyn MetadataCodec>,
}

impl Default for ParquetOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            compression_level: None,
            data_page_version: DataPageVersion::default(),
            page_row_limit: DEFAULT_PAGE_ROW_LIMIT,
            dictionary_enabled: true,
            treat_byte_array_as_string: false,
            treat_big_integers_as_dates: true,
            created_by: DEFAULT_CREATED_BY.to_string(),
            registry: Arc::new(TypeRegistry::default()),
            metadata_codec: Arc::new(ThriftCompactCodec),
        }
    }
}

impl ParquetOptions {
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = Some(level);
        self
    }

    pub fn with_data_page_version(mut self, version: DataPageVersion) -> Self {
        self.data_page_version = version;
        self
    }

    /// Clamped to at least one slot per page.
    pub fn with_page_row_limit(mut self, limit: usize) -> Self {
        self.page_row_limit = limit.max(1);
        self
    }

    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    pub fn with_treat_byte_array_as_string(mut self, on: bool) -> Self {
        self.treat_byte_array_as_string = on;
        self
    }

    pub fn with_treat_big_integers_as_dates(mut self, on: bool) -> Self {
        self.treat_big_integers_as_dates = on;
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = created_by.into();
        self
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_metadata_codec(mut self, codec: Arc<dyn MetadataCodec>) -> Self {
        self.metadata_codec = codec;
        self
    }
}
