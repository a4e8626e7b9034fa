//! Capability-masking stream wrapper.
//!
//! Wraps any [`ContainerStream`] and withholds some of its capabilities.
//! Masked operations fail with [`io::ErrorKind::Unsupported`]. Useful for
//! writing to pipes and sockets through the forward-only path, and for
//! exercising capability checks.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite, ReadBuf};

use crate::enums::StreamCapabilities;
use crate::traits::container_stream::ContainerStream;

#[derive(Debug)]
pub struct Restricted<S> {
    inner: S,
    caps: StreamCapabilities,
}

fn unsupported(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, format!("stream is not {what}"))
}

impl<S: ContainerStream> Restricted<S> {
    /// Expose only the capabilities in `caps` that `inner` also has.
    pub fn new(inner: S, caps: StreamCapabilities) -> Self {
        let own = inner.capabilities();
        Self {
            inner,
            caps: StreamCapabilities {
                readable: caps.readable && own.readable,
                seekable: caps.seekable && own.seekable,
                writable: caps.writable && own.writable,
            },
        }
    }

    /// Writable only: no reads, no seeks.
    pub fn write_only(inner: S) -> Self {
        Self::new(
            inner,
            StreamCapabilities {
                readable: false,
                seekable: false,
                writable: true,
            },
        )
    }

    /// Readable and seekable, never written.
    pub fn read_only(inner: S) -> Self {
        Self::new(
            inner,
            StreamCapabilities {
                readable: true,
                seekable: true,
                writable: false,
            },
        )
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ContainerStream> AsyncRead for Restricted<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.caps.readable {
            return Poll::Ready(Err(unsupported("readable")));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: ContainerStream> AsyncWrite for Restricted<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if !this.caps.writable {
            return Poll::Ready(Err(unsupported("writable")));
        }
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

impl<S: ContainerStream> AsyncSeek for Restricted<S> {
    fn start_seek(self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        let this = self.get_mut();
        if !this.caps.seekable {
            return Err(unsupported("seekable"));
        }
        Pin::new(&mut this.inner).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        let this = self.get_mut();
        if !this.caps.seekable {
            return Poll::Ready(Err(unsupported("seekable")));
        }
        Pin::new(&mut this.inner).poll_complete(cx)
    }
}

impl<S: ContainerStream> ContainerStream for Restricted<S> {
    fn capabilities(&self) -> StreamCapabilities {
        self.caps
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn write_only_blocks_reads_and_seeks() {
        let mut s = Restricted::write_only(Cursor::new(Vec::new()));
        assert!(!s.capabilities().can_open());
        s.write_all(b"abc").await.unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(s.read(&mut buf).await.unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert!(s.seek(io::SeekFrom::Start(0)).await.is_err());
        assert_eq!(s.into_inner().into_inner(), b"abc");
    }

    #[tokio::test]
    async fn read_only_blocks_writes() {
        let mut s = Restricted::read_only(Cursor::new(b"xyz".to_vec()));
        assert!(s.write_all(b"q").await.is_err());
        let mut out = String::new();
        s.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "xyz");
    }
}
