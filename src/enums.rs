/// Data page layout emitted by the column writer.
///
/// Both layouts are always accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataPageVersion {
    /// Levels and values compressed together; levels carry a 4-byte length prefix.
    #[default]
    V1,

    /// Levels stored uncompressed ahead of the values; only values are compressed.
    V2,
}

/// Lifecycle of a row group writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting columns in strict schema order.
    Open,

    /// Every leaf column has been written; ready to commit.
    Complete,

    /// A column write failed; the writer can only be discarded.
    Poisoned,
}

/// Which stream operations a container may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCapabilities {
    pub readable: bool,
    pub seekable: bool,
    pub writable: bool,
}

impl StreamCapabilities {
    /// Readable, seekable and writable.
    pub const ALL: Self = Self {
        readable: true,
        seekable: true,
        writable: true,
    };

    /// Readable and seekable, never written.
    pub const READ_ONLY: Self = Self {
        readable: true,
        seekable: true,
        writable: false,
    };

    /// Whether the stream supports everything `open` needs.
    pub fn can_open(&self) -> bool {
        self.readable && self.seekable
    }
}

impl Default for StreamCapabilities {
    fn default() -> Self {
        Self::ALL
    }
}
