//! Read-only view over one committed row group.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::enums::StreamCapabilities;
use crate::error::{ParquetError, Result};
use crate::models::buffers::BufferPool;
use crate::models::readers::column_reader::{ChunkSource, read_column_chunk};
use crate::models::schema_tree::SchemaTree;
use crate::models::types::column::Column;
use crate::models::types::metadata::{ColumnChunkDescriptor, RowGroupDescriptor};
use crate::models::types::schema::{DataField, Schema};
use crate::options::ParquetOptions;
use crate::traits::container_stream::ContainerStream;
use crate::utils::join_path;

/// Shared state a row group needs from its container.
#[derive(Debug)]
pub(crate) struct ReadContext<S> {
    pub stream: Arc<Mutex<S>>,
    pub caps: StreamCapabilities,
    pub tree: Arc<SchemaTree>,
    pub schema: Arc<Schema>,
    pub options: Arc<ParquetOptions>,
    pub pool: BufferPool,
}

impl<S> Clone for ReadContext<S> {
    fn clone(&self) -> Self {
        Self {
            stream: Arc::clone(&self.stream),
            caps: self.caps,
            tree: Arc::clone(&self.tree),
            schema: Arc::clone(&self.schema),
            options: Arc::clone(&self.options),
            pool: self.pool.clone(),
        }
    }
}

/// A committed row group. Columns can be read in any order, any number of times.
#[derive(Debug)]
pub struct RowGroup<S> {
    index: usize,
    descriptor: RowGroupDescriptor,
    chunks: HashMap<String, usize>,
    ctx: ReadContext<S>,
}

impl<S: ContainerStream> RowGroup<S> {
    /// Index the descriptor's chunks by path.
    ///
    /// # Errors
    /// [`ParquetError::DuplicateField`] if two chunks carry the same path.
    pub(crate) fn new(index: usize, descriptor: RowGroupDescriptor, ctx: ReadContext<S>) -> Result<Self> {
        let mut chunks = HashMap::with_capacity(descriptor.columns.len());
        for (i, chunk) in descriptor.columns.iter().enumerate() {
            let path = join_path(chunk.path());
            if chunks.insert(path.clone(), i).is_some() {
                return Err(ParquetError::DuplicateField(path));
            }
        }
        Ok(Self {
            index,
            descriptor,
            chunks,
            ctx,
        })
    }

    /// Position of this row group in the file.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Rows in this group, as recorded in its descriptor.
    pub fn row_count(&self) -> usize {
        self.descriptor.num_rows.max(0) as usize
    }

    /// The footer entry this row group was built from.
    pub fn descriptor(&self) -> &RowGroupDescriptor {
        &self.descriptor
    }

    /// Column chunk descriptors in schema leaf order.
    pub fn columns(&self) -> &[ColumnChunkDescriptor] {
        &self.descriptor.columns
    }

    /// Whether a chunk exists at `field`'s path. [`RowGroup::read`] fails with
    /// [`ParquetError::FieldNotFound`] exactly when this is false.
    pub fn has_column(&self, field: &DataField) -> bool {
        self.chunks.contains_key(&field.path_string())
    }

    /// Read the column chunk for `field`.
    ///
    /// # Errors
    /// [`ParquetError::FieldNotFound`] if the row group has no chunk at the
    /// field's path, [`ParquetError::Capability`] if the stream cannot be read
    /// back.
    pub async fn read(&self, field: &DataField) -> Result<Column> {
        let key = field.path_string();
        let chunk = self
            .chunks
            .get(&key)
            .map(|&i| &self.descriptor.columns[i])
            .ok_or_else(|| ParquetError::FieldNotFound(key.clone()))?;
        if !self.ctx.caps.can_open() {
            return Err(ParquetError::Capability(
                "reading a column requires a readable and seekable stream".into(),
            ));
        }
        if let Some(external) = &chunk.file_path {
            return Err(ParquetError::Format(format!(
                "'{key}' is stored in external file '{external}'"
            )));
        }
        let meta = chunk
            .meta_data
            .as_ref()
            .ok_or_else(|| ParquetError::Metadata(format!("column chunk '{key}' has no metadata")))?;

        let tree = &self.ctx.tree;
        let element = tree
            .find_leaf(field.path())
            .and_then(|i| tree.element(i))
            .ok_or_else(|| ParquetError::FieldNotFound(key.clone()))?;
        if element.physical_type != Some(meta.physical_type) {
            return Err(ParquetError::Metadata(format!(
                "'{key}' is {:?} in the schema but {:?} in its column chunk",
                element.physical_type, meta.physical_type
            )));
        }
        let options = self.ctx.options.as_ref();
        let handler = options.registry.handler_for_element(element, options)?;
        let source = ChunkSource {
            element,
            levels: tree.levels_for(field.path())?,
            handler: handler.as_ref(),
            options,
            pool: &self.ctx.pool,
        };

        let mut stream = self.ctx.stream.lock().await;
        read_column_chunk(&mut *stream, field, meta, &source).await
    }

    /// Every leaf column in schema order. Each column is a separate seek and read.
    pub async fn read_all(&self) -> Result<Vec<Column>> {
        let fields = self.ctx.schema.data_fields();
        let mut out = Vec::with_capacity(fields.len());
        for field in &fields {
            out.push(self.read(field).await?);
        }
        Ok(out)
    }
}
