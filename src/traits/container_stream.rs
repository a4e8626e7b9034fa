use std::io::Cursor;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite};

use crate::enums::StreamCapabilities;

/// Byte stream a container sits on.
///
/// Implementors report what they actually support so the container can fail
/// fast with a capability error instead of mid-operation. Operations outside
/// the reported capabilities are never attempted.
pub trait ContainerStream: AsyncRead + AsyncWrite + AsyncSeek + Unpin + Send {
    fn capabilities(&self) -> StreamCapabilities {
        StreamCapabilities::ALL
    }
}

impl ContainerStream for File {}

impl ContainerStream for Cursor<Vec<u8>> {}

impl<T: ContainerStream + ?Sized> ContainerStream for Box<T> {
    fn capabilities(&self) -> StreamCapabilities {
        (**self).capabilities()
    }
}

impl<T: ContainerStream + ?Sized> ContainerStream for &mut T {
    fn capabilities(&self) -> StreamCapabilities {
        (**self).capabilities()
    }
}
