//! # Pooled Page Buffers
//!
//! Page payloads are read into buffers rented from a [`BufferPool`]. Each
//! rental is a [`PooledBuffer`] guard: dropping it hands the allocation back
//! to the pool exactly once, and [`PooledBuffer::into_vec`] detaches the
//! allocation so it is never returned. There is no raw "return" call, so a
//! buffer cannot be released twice or used after release.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Free buffers retained per pool.
const MAX_POOLED_BUFFERS: usize = 16;
/// Buffers larger than this are dropped instead of pooled.
const MAX_POOLED_CAPACITY: usize = 16 * 1024 * 1024;

#[derive(Debug, Default)]
struct PoolInner {
    free: Mutex<Vec<Vec<u8>>>,
    outstanding: AtomicUsize,
}

/// Shared pool of reusable byte buffers. Cloning shares the pool.
#[derive(Debug, Clone, Default)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rent a zero-filled buffer of exactly `len` bytes.
    pub fn rent(&self, len: usize) -> PooledBuffer {
        let mut buf = self
            .inner
            .free
            .lock()
            .ok()
            .and_then(|mut free| free.pop())
            .unwrap_or_default();
        buf.clear();
        buf.resize(len, 0);
        self.inner.outstanding.fetch_add(1, Ordering::Relaxed);
        PooledBuffer {
            buf: Some(buf),
            pool: self.clone(),
        }
    }

    /// Buffers currently rented and not yet released.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Relaxed)
    }

    /// Free buffers waiting for reuse.
    pub fn available(&self) -> usize {
        self.inner.free.lock().map(|f| f.len()).unwrap_or(0)
    }

    fn release(&self, buf: Vec<u8>) {
        self.inner.outstanding.fetch_sub(1, Ordering::Relaxed);
        if buf.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        if let Ok(mut free) = self.inner.free.lock() {
            if free.len() < MAX_POOLED_BUFFERS {
                free.push(buf);
            }
        }
    }

    fn detach(&self) {
        self.inner.outstanding.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A rented buffer that returns itself to its pool on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: BufferPool,
}

impl PooledBuffer {
    /// Shrink the visible length to `len` (no-op if already shorter).
    pub fn truncate(&mut self, len: usize) {
        if let Some(b) = self.buf.as_mut() {
            b.truncate(len);
        }
    }

    /// Take ownership of the bytes. The allocation leaves the pool for good.
    pub fn into_vec(mut self) -> Vec<u8> {
        match self.buf.take() {
            Some(b) => {
                self.pool.detach();
                b
            }
            None => Vec::new(),
        }
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(b) = self.buf.take() {
            self.pool.release(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_returns_buffer_once() {
        let pool = BufferPool::new();
        let b = pool.rent(32);
        assert_eq!(b.len(), 32);
        assert_eq!(pool.outstanding(), 1);
        drop(b);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn rented_buffer_is_reused_and_zeroed() {
        let pool = BufferPool::new();
        {
            let mut b = pool.rent(4);
            b.copy_from_slice(&[9, 9, 9, 9]);
        }
        let b = pool.rent(6);
        assert_eq!(&*b, &[0, 0, 0, 0, 0, 0]);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn into_vec_detaches_from_pool() {
        let pool = BufferPool::new();
        let mut b = pool.rent(3);
        b.copy_from_slice(b"abc");
        let v = b.into_vec();
        assert_eq!(v, b"abc");
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.available(), 0);
    }
}
