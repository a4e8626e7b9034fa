//! # Parquet Errors
//!
//! Unified error type for every container, schema, page and codec operation.
//!
//! The first group of variants is the public failure taxonomy callers match on
//! (framing, capabilities, column order, field lookup, type handlers, codecs,
//! short reads). The remainder covers I/O, metadata decoding and column
//! validation. Conversion impls are provided for common error sources so that
//! encoders/decoders can propagate errors directly with `?`.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ParquetError>;

/// Unified error type for all Parquet operations.
#[derive(Debug, Error)]
pub enum ParquetError {
    /// Bad or missing magic, file too small, malformed page layout.
    #[error("format error: {0}")]
    Format(String),

    /// The stream lacks a capability (read/seek/write) the operation needs.
    #[error("stream capability error: {0}")]
    Capability(String),

    /// A column was written out of the declared physical schema order.
    #[error("column order violation: expected '{expected}', got '{actual}'")]
    SchemaOrder { expected: String, actual: String },

    /// Two leaves or two column chunks share one dot-joined path.
    #[error("path '{0}' appears more than once")]
    DuplicateField(String),

    /// The requested field has no column chunk in this row group.
    #[error("'{0}' does not exist in this file")]
    FieldNotFound(String),

    /// No type handler matches a physical/logical type combination.
    #[error("no type handler for {0}")]
    HandlerNotFound(String),

    /// Codec id unknown or not compiled in.
    #[error("unsupported compression codec: {0}")]
    UnsupportedCodec(String),

    /// The stream ran dry before the declared page length was read.
    #[error("expected {expected} bytes in source stream but could read only {actual}")]
    UnderRead { expected: usize, actual: usize },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Compression codec failure.
    #[error("compression error: {0}")]
    Compression(String),

    /// Footer or page-header metadata is malformed.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// Footer or page-header bytes ended mid-structure.
    #[error("unexpected end of input: {0}")]
    UnexpectedEof(String),

    /// The in-memory column is inconsistent with its field.
    #[error("invalid column: {0}")]
    InvalidColumn(String),

    /// The schema passed for append differs from the file's schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Internal logic error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<FromUtf8Error> for ParquetError {
    fn from(e: FromUtf8Error) -> Self {
        ParquetError::Format(e.to_string())
    }
}

#[cfg(feature = "snappy")]
impl From<snap::Error> for ParquetError {
    fn from(e: snap::Error) -> Self {
        ParquetError::Compression(format!("Snappy: {e}"))
    }
}
