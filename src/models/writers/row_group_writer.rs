//! # Writeable Row Group
//!
//! Accepts one column per schema leaf, in strict schema order, and appends
//! each encoded chunk to the container's stream as soon as it is written.
//! [`WriteableRowGroup::commit`] publishes the row group into the footer.
//!
//! The writer borrows its container mutably for its whole life, so only one
//! row group can be open at a time.

use std::sync::Arc;

use log::{debug, warn};

use crate::enums::WriterState;
use crate::error::{ParquetError, Result};
use crate::models::file::ParquetFile;
use crate::models::types::column::Column;
use crate::models::types::metadata::RowGroupDescriptor;
use crate::models::types::schema::DataField;
use crate::models::writers::column_writer::{ChunkTarget, EncodedChunk, encode_column_chunk};
use crate::traits::container_stream::ContainerStream;

#[derive(Debug)]
pub struct WriteableRowGroup<'a, S: ContainerStream> {
    file: &'a mut ParquetFile<S>,
    fields: Vec<DataField>,
    next: usize,
    rows: Option<usize>,
    state: WriterState,
    descriptor: RowGroupDescriptor,
    /// Where the next chunk starts.
    cursor: u64,
    committed: bool,
}

impl<'a, S: ContainerStream> WriteableRowGroup<'a, S> {
    pub(crate) fn new(file: &'a mut ParquetFile<S>) -> Self {
        let fields = file.schema().data_fields();
        let cursor = file.data_end();
        let state = if fields.is_empty() { WriterState::Complete } else { WriterState::Open };
        Self {
            file,
            fields,
            next: 0,
            rows: None,
            state,
            descriptor: RowGroupDescriptor::default(),
            cursor,
            committed: false,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// The leaf the next `write` must supply, if any remain.
    pub fn next_field(&self) -> Option<&DataField> {
        self.fields.get(self.next)
    }

    /// Rows in this group, once a column has fixed the count.
    pub fn row_count(&self) -> usize {
        self.rows.unwrap_or(0)
    }

    /// Encode and write the next column.
    ///
    /// # Errors
    /// - [`ParquetError::SchemaOrder`] if `column` is not for the next leaf;
    ///   nothing is written in that case.
    /// - [`ParquetError::InvalidColumn`] if the column's levels or values do
    ///   not fit its field, or its row count differs from earlier columns.
    /// - I/O errors from the stream. On a seekable stream the next write
    ///   starts again at this column's offset.
    pub async fn write(&mut self, column: &Column) -> Result<()> {
        if self.state == WriterState::Poisoned {
            return Err(ParquetError::InvalidColumn(
                "row group writer is unusable after a failed write on a forward-only stream".into(),
            ));
        }
        let actual = column.field().path_string();
        let expected = self.fields.get(self.next).ok_or_else(|| ParquetError::SchemaOrder {
            expected: "<no more columns>".into(),
            actual: actual.clone(),
        })?;
        if column.field() != expected {
            return Err(ParquetError::SchemaOrder {
                expected: expected.path_string(),
                actual,
            });
        }

        let max_repetition = self.file.footer().tree().levels_for(expected.path())?.max_repetition;
        let chunk = self.encode(column, expected)?;

        // An empty repeated column says nothing about the row count.
        let rows = chunk.num_rows;
        let counts_rows = !column.is_empty() || max_repetition == 0;
        match self.rows {
            Some(n) if counts_rows && n != rows => {
                return Err(ParquetError::InvalidColumn(format!(
                    "'{actual}' has {rows} rows, row group has {n}"
                )));
            }
            None if counts_rows => self.rows = Some(rows),
            _ => {}
        }

        if let Err(e) = self.file.write_at(self.cursor, &chunk.bytes).await {
            if !self.file.capabilities().seekable {
                self.state = WriterState::Poisoned;
            }
            return Err(e);
        }
        self.cursor += chunk.bytes.len() as u64;
        self.descriptor.columns.push(chunk.descriptor);
        self.next += 1;
        if self.next == self.fields.len() {
            self.state = WriterState::Complete;
        }
        Ok(())
    }

    fn encode(&self, column: &Column, field: &DataField) -> Result<EncodedChunk> {
        let tree = Arc::clone(self.file.footer().tree());
        let options = self.file.options();
        let index = tree
            .find_leaf(field.path())
            .ok_or_else(|| ParquetError::FieldNotFound(field.path_string()))?;
        let element = tree
            .element(index)
            .ok_or_else(|| ParquetError::Internal(format!("leaf {index} missing from schema tree")))?;
        let path = tree.path_for(index);
        let handler = options.registry.handler_for_element(element, options)?;
        let target = ChunkTarget {
            element,
            path: &path[..],
            levels: tree.levels_for(field.path())?,
            handler: handler.as_ref(),
            options,
        };
        encode_column_chunk(column, &target, self.cursor)
    }

    /// Publish the row group into the container's footer.
    ///
    /// # Errors
    /// [`ParquetError::SchemaOrder`] if some leaf has no column yet.
    pub fn commit(mut self) -> Result<()> {
        match self.state {
            WriterState::Complete => {}
            WriterState::Poisoned => {
                return Err(ParquetError::InvalidColumn(
                    "cannot commit a row group after a failed write".into(),
                ));
            }
            WriterState::Open => {
                let expected = self.fields.get(self.next).map(DataField::path_string).unwrap_or_default();
                return Err(ParquetError::SchemaOrder {
                    expected,
                    actual: "<commit>".into(),
                });
            }
        }

        let mut descriptor = std::mem::take(&mut self.descriptor);
        descriptor.num_rows = self.rows.unwrap_or(0) as i64;
        descriptor.total_byte_size = descriptor
            .columns
            .iter()
            .filter_map(|c| c.meta_data.as_ref())
            .map(|m| m.total_uncompressed_size)
            .sum();
        descriptor.total_compressed_size = Some(
            descriptor
                .columns
                .iter()
                .filter_map(|c| c.meta_data.as_ref())
                .map(|m| m.total_compressed_size)
                .sum(),
        );
        descriptor.file_offset = descriptor.columns.first().map(|c| c.file_offset);
        descriptor.ordinal = Some(self.file.row_groups().len() as i16);
        debug!(
            "committing row group {} with {} rows, {} bytes",
            self.file.row_groups().len(),
            descriptor.num_rows,
            descriptor.total_compressed_size.unwrap_or(0)
        );

        self.committed = true;
        self.file.commit_row_group(descriptor, self.cursor)
    }
}

impl<S: ContainerStream> Drop for WriteableRowGroup<'_, S> {
    fn drop(&mut self) {
        if !self.committed && self.next > 0 {
            warn!(
                "row group writer dropped after {} of {} columns without commit",
                self.next,
                self.fields.len()
            );
        }
    }
}
