//! # Parquet File Container
//!
//! [`ParquetFile`] owns the byte stream and the footer model. It validates
//! the `PAR1 ... footer | len | PAR1` framing on open, hands out row groups
//! for reading, one [`WriteableRowGroup`] at a time for writing, and writes
//! the footer back on [`ParquetFile::finalize`].
//!
//! ## Layout
//! ```text
//! PAR1 | chunk bytes ... | footer | footer length (i32 LE) | PAR1
//! ```
//!
//! Appending writes new chunks over the old footer and re-seals the file on
//! finalize. When the new tail would end before the old one, zero padding
//! is placed between the data and the footer so no stale bytes follow the
//! closing magic.
//!
//! A writable stream that cannot seek is accepted by `create`; the container
//! then tracks the write position itself and never seeks.

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::constants::{FOOTER_TAIL_LEN, MAGIC_LEN, PARQUET_MAGIC};
use crate::enums::StreamCapabilities;
use crate::error::{ParquetError, Result};
use crate::models::buffers::BufferPool;
use crate::models::footer::{CustomMetadata, Footer, to_physical_schema};
use crate::models::readers::row_group::{ReadContext, RowGroup};
use crate::models::types::column::Column;
use crate::models::types::metadata::RowGroupDescriptor;
use crate::models::types::schema::Schema;
use crate::models::writers::row_group_writer::WriteableRowGroup;
use crate::options::ParquetOptions;
use crate::traits::container_stream::ContainerStream;

/// Warns when a container with unsaved changes goes out of scope.
#[derive(Debug, Default)]
struct FinalizeGuard {
    dirty: bool,
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        if self.dirty {
            warn!("parquet container dropped with unwritten footer; call finalize() before dropping");
        }
    }
}

/// An open Parquet container over a stream `S`.
#[derive(Debug)]
pub struct ParquetFile<S: ContainerStream> {
    stream: Arc<Mutex<S>>,
    caps: StreamCapabilities,
    footer: Footer,
    schema: Arc<Schema>,
    options: Arc<ParquetOptions>,
    pool: BufferPool,
    row_groups: Vec<RowGroup<S>>,
    /// End of the committed chunk data; the footer is written here.
    data_end: u64,
    /// Stream position for forward-only streams. `None` once unknown.
    position: Option<u64>,
    /// Largest stream length seen, so a shorter tail can be padded.
    high_water: u64,
    guard: FinalizeGuard,
}

impl<S: ContainerStream> ParquetFile<S> {
    /// Open an existing container for reading, or for appending when the
    /// stream is also writable.
    ///
    /// Only reads from the stream, so a failed open leaves it unmodified.
    ///
    /// # Errors
    /// - [`ParquetError::Capability`] if the stream is not readable and seekable.
    /// - [`ParquetError::Format`] if the stream is 8 bytes or shorter, either
    ///   magic marker is wrong, or the footer length does not fit.
    pub async fn open(stream: S, options: ParquetOptions) -> Result<Self> {
        let caps = stream.capabilities();
        Self::open_with_capabilities(stream, caps, options).await
    }

    /// [`ParquetFile::open`] with capabilities known to the caller, for
    /// handles whose open mode is narrower than their type reports.
    async fn open_with_capabilities(
        mut stream: S,
        caps: StreamCapabilities,
        options: ParquetOptions,
    ) -> Result<Self> {
        if !caps.can_open() {
            return Err(ParquetError::Capability(
                "opening a container requires a readable and seekable stream".into(),
            ));
        }

        let len = stream.seek(SeekFrom::End(0)).await?;
        if len <= FOOTER_TAIL_LEN as u64 {
            return Err(ParquetError::Format(format!(
                "not a Parquet file (size too small: {len} bytes)"
            )));
        }

        let mut head = [0u8; MAGIC_LEN];
        stream.seek(SeekFrom::Start(0)).await?;
        stream.read_exact(&mut head).await?;
        if &head != PARQUET_MAGIC {
            return Err(ParquetError::Format(format!(
                "not a Parquet file (head is '{}')",
                String::from_utf8_lossy(&head)
            )));
        }

        let mut tail = [0u8; FOOTER_TAIL_LEN];
        stream.seek(SeekFrom::End(-(FOOTER_TAIL_LEN as i64))).await?;
        stream.read_exact(&mut tail).await?;
        if &tail[4..] != PARQUET_MAGIC {
            return Err(ParquetError::Format(format!(
                "not a Parquet file (tail is '{}')",
                String::from_utf8_lossy(&tail[4..])
            )));
        }

        let footer_len = i32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        let data_end = u64::try_from(footer_len)
            .ok()
            .filter(|&n| n > 0)
            .and_then(|n| len.checked_sub(n + FOOTER_TAIL_LEN as u64))
            .filter(|&end| end >= MAGIC_LEN as u64)
            .ok_or_else(|| {
                ParquetError::Format(format!("invalid footer length {footer_len} for a {len} byte file"))
            })?;

        let mut bytes = vec![0u8; footer_len as usize];
        stream.seek(SeekFrom::Start(data_end)).await?;
        stream.read_exact(&mut bytes).await?;
        let meta = options.metadata_codec.decode_file_metadata(&bytes)?;
        let footer = Footer::from_metadata(meta)?;
        let schema = footer.to_logical_schema(&options)?;
        debug!(
            "opened parquet container: {} bytes, {} row groups, {} rows",
            len,
            footer.row_groups().len(),
            footer.num_rows()
        );

        let mut file = Self {
            stream: Arc::new(Mutex::new(stream)),
            caps,
            footer,
            schema: Arc::new(schema),
            options: Arc::new(options),
            pool: BufferPool::new(),
            row_groups: Vec::new(),
            data_end,
            position: None,
            high_water: len,
            guard: FinalizeGuard::default(),
        };
        let descriptors = file.footer.row_groups().to_vec();
        for rg in descriptors {
            file.push_row_group(rg)?;
        }
        Ok(file)
    }

    /// Start a new container on an empty stream, or append to an existing one.
    ///
    /// On an empty stream the opening magic is written immediately. A stream
    /// that cannot seek is treated as empty and written forward-only.
    ///
    /// # Errors
    /// - [`ParquetError::Capability`] if the stream is not writable.
    /// - [`ParquetError::SchemaMismatch`] when appending with a schema whose
    ///   physical layout differs from the file's.
    /// - Any [`ParquetFile::open`] error for a non-empty stream.
    pub async fn create(mut stream: S, schema: Schema, options: ParquetOptions) -> Result<Self> {
        let caps = stream.capabilities();
        if !caps.writable {
            return Err(ParquetError::Capability(
                "creating a container requires a writable stream".into(),
            ));
        }

        let len = if caps.seekable { stream.seek(SeekFrom::End(0)).await? } else { 0 };
        if len > 0 {
            let physical = to_physical_schema(&schema, &options.registry)?;
            let mut file = Self::open(stream, options).await?;
            if !file.footer.same_schema(&physical) {
                return Err(ParquetError::SchemaMismatch(
                    "schema passed for append differs from the file's schema".into(),
                ));
            }
            file.schema = Arc::new(schema);
            debug!("appending to parquet container of {len} bytes");
            return Ok(file);
        }

        let footer = Footer::from_schema(&schema, &options)?;
        stream.write_all(PARQUET_MAGIC).await?;
        debug!(
            "created parquet container with {} leaf columns{}",
            schema.data_fields().len(),
            if caps.seekable { "" } else { " (forward-only)" }
        );
        Ok(Self {
            stream: Arc::new(Mutex::new(stream)),
            caps,
            footer,
            schema: Arc::new(schema),
            options: Arc::new(options),
            pool: BufferPool::new(),
            row_groups: Vec::new(),
            data_end: MAGIC_LEN as u64,
            position: Some(MAGIC_LEN as u64),
            high_water: MAGIC_LEN as u64,
            guard: FinalizeGuard { dirty: true },
        })
    }

    /// Logical schema of the file. On append this is the schema passed to `create`.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Committed row groups in file order, including ones written through this handle.
    pub fn row_groups(&self) -> &[RowGroup<S>] {
        &self.row_groups
    }

    /// Total rows across committed row groups.
    pub fn num_rows(&self) -> i64 {
        self.footer.num_rows()
    }

    /// Custom key/value metadata stored in the footer.
    pub fn metadata(&self) -> &CustomMetadata {
        self.footer.metadata()
    }

    /// Custom key/value metadata. Written by the next `finalize` that writes a footer.
    pub fn metadata_mut(&mut self) -> &mut CustomMetadata {
        self.footer.metadata_mut()
    }

    /// The footer model: physical schema, row-group descriptors and schema tree.
    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    /// Options the container was opened or created with.
    pub fn options(&self) -> &ParquetOptions {
        &self.options
    }

    /// What the container may do with its stream. Fixed when the container is opened.
    pub fn capabilities(&self) -> StreamCapabilities {
        self.caps
    }

    /// Whether `finalize` has work to do.
    pub fn is_dirty(&self) -> bool {
        self.guard.dirty
    }

    /// Begin a row group. The container stays borrowed until it is committed or dropped.
    ///
    /// # Errors
    /// [`ParquetError::Capability`] if the stream is not writable.
    pub fn new_row_group(&mut self) -> Result<WriteableRowGroup<'_, S>> {
        if !self.caps.writable {
            return Err(ParquetError::Capability(
                "writing a row group requires a writable stream".into(),
            ));
        }
        Ok(WriteableRowGroup::new(self))
    }

    /// Write `columns` as one row group, in schema order, and commit it.
    pub async fn write_row_group(&mut self, columns: &[Column]) -> Result<()> {
        let mut rg = self.new_row_group()?;
        for column in columns {
            rg.write(column).await?;
        }
        rg.commit()
    }

    /// Every row group's columns, in file order.
    pub async fn read_all_row_groups(&self) -> Result<Vec<Vec<Column>>> {
        let mut out = Vec::with_capacity(self.row_groups.len());
        for rg in &self.row_groups {
            out.push(rg.read_all().await?);
        }
        Ok(out)
    }

    /// Every leaf column with all row groups concatenated in file order.
    ///
    /// Values, nulls and levels of each row group follow those of the one
    /// before it. A file without row groups yields no columns.
    ///
    /// # Errors
    /// Any [`RowGroup::read`] error, or [`ParquetError::InvalidColumn`] if
    /// two row groups disagree on a column's levels.
    pub async fn read_all(&self) -> Result<Vec<Column>> {
        let mut merged: Vec<Column> = Vec::new();
        for (i, rg) in self.row_groups.iter().enumerate() {
            let columns = rg.read_all().await?;
            if i == 0 {
                merged = columns;
                continue;
            }
            for (acc, column) in merged.iter_mut().zip(columns) {
                acc.append(column)?;
            }
        }
        Ok(merged)
    }

    /// Write the footer, its length and the closing magic, then flush.
    ///
    /// Does nothing when no row group was committed since the last finalize
    /// (or since open), so it can be called any number of times.
    pub async fn finalize(&mut self) -> Result<()> {
        if !self.guard.dirty {
            return Ok(());
        }
        let footer = self.footer.serialize(self.options.metadata_codec.as_ref())?;
        let footer_len = i32::try_from(footer.len())
            .map_err(|_| ParquetError::Format(format!("footer of {} bytes is too large", footer.len())))?;

        let offset = if self.caps.seekable {
            self.data_end
        } else {
            self.position.ok_or_else(|| {
                ParquetError::Capability("forward-only stream position lost after a failed write".into())
            })?
        };
        let tail_len = (footer.len() + FOOTER_TAIL_LEN) as u64;
        let padding = if self.caps.seekable {
            self.high_water.saturating_sub(offset + tail_len) as usize
        } else {
            0
        };

        let mut tail = Vec::with_capacity(padding + tail_len as usize);
        tail.resize(padding, 0);
        tail.extend_from_slice(&footer);
        tail.extend_from_slice(&footer_len.to_le_bytes());
        tail.extend_from_slice(PARQUET_MAGIC);
        self.write_at(offset, &tail).await?;
        self.stream.lock().await.flush().await?;

        debug!(
            "finalized parquet container: {} row groups, {} rows, footer {} bytes",
            self.footer.row_groups().len(),
            self.footer.num_rows(),
            footer.len()
        );
        self.guard.dirty = false;
        Ok(())
    }

    /// Finalize and give the stream back.
    pub async fn into_inner(mut self) -> Result<S> {
        self.finalize().await?;
        self.row_groups.clear();
        let stream = Arc::clone(&self.stream);
        drop(self);
        Arc::try_unwrap(stream)
            .map(Mutex::into_inner)
            .map_err(|_| ParquetError::Internal("stream is still shared by a row group".into()))
    }

    pub(crate) fn data_end(&self) -> u64 {
        self.data_end
    }

    /// Write `bytes` at `offset`. Forward-only streams must already be there.
    pub(crate) async fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.guard.dirty = true;
        let mut stream = self.stream.lock().await;
        if self.caps.seekable {
            stream.seek(SeekFrom::Start(offset)).await?;
        } else if self.position != Some(offset) {
            return Err(ParquetError::Capability(format!(
                "forward-only stream cannot move from {:?} to byte {offset}",
                self.position
            )));
        }
        match stream.write_all(bytes).await {
            Ok(()) => {
                let end = offset + bytes.len() as u64;
                self.position = Some(end);
                self.high_water = self.high_water.max(end);
                Ok(())
            }
            Err(e) => {
                self.position = None;
                Err(e.into())
            }
        }
    }

    pub(crate) fn commit_row_group(&mut self, descriptor: RowGroupDescriptor, end: u64) -> Result<()> {
        self.push_row_group(descriptor.clone())?;
        self.data_end = end;
        self.footer.add_row_group(descriptor);
        self.guard.dirty = true;
        Ok(())
    }

    fn push_row_group(&mut self, descriptor: RowGroupDescriptor) -> Result<()> {
        let ctx = ReadContext {
            stream: Arc::clone(&self.stream),
            caps: self.caps,
            tree: Arc::clone(self.footer.tree()),
            schema: Arc::clone(&self.schema),
            options: Arc::clone(&self.options),
            pool: self.pool.clone(),
        };
        let index = self.row_groups.len();
        self.row_groups.push(RowGroup::new(index, descriptor, ctx)?);
        Ok(())
    }
}

impl ParquetFile<File> {
    /// Open a file on disk read-only.
    ///
    /// The container records read-only capabilities, so
    /// [`ParquetFile::new_row_group`] fails with [`ParquetError::Capability`].
    pub async fn open_path(path: impl AsRef<Path>, options: ParquetOptions) -> Result<Self> {
        let file = File::open(path).await?;
        Self::open_with_capabilities(file, StreamCapabilities::READ_ONLY, options).await
    }

    /// Create a file on disk, or append to it if it already has content.
    pub async fn create_path(path: impl AsRef<Path>, schema: Schema, options: ParquetOptions) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await?;
        Self::create(file, schema, options).await
    }
}

/// Create a container on `stream`, write `columns` as one row group and
/// finalize. Returns the stream.
pub async fn write_single_row_group<S: ContainerStream>(
    stream: S,
    schema: Schema,
    columns: &[Column],
    options: ParquetOptions,
) -> Result<S> {
    let mut file = ParquetFile::create(stream, schema, options).await?;
    file.write_row_group(columns).await?;
    file.into_inner().await
}
