//! Mutable byte view used on the ingress path.

use crate::slice::RSlice;
use bytes::BytesMut;

/// A writable region of a parser's input buffer.
///
/// The parser decides the size; the pump fills some prefix of it with one
/// read and turns the filled part into an [`RSlice`] without copying.
#[derive(Debug)]
pub struct WSlice {
    buf: BytesMut,
}

impl WSlice {
    /// Carves a `capacity`-byte window off the front of `pool`.
    ///
    /// `pool` keeps whatever it had beyond that window. Once every view of a
    /// previous window has been dropped, `BytesMut::reserve` on the pool
    /// reclaims the same allocation, so a steady-state parser does not
    /// allocate per read.
    pub fn carve(pool: &mut BytesMut, capacity: usize) -> Self {
        pool.reserve(capacity);
        if pool.len() < capacity {
            pool.resize(capacity, 0);
        }
        Self {
            buf: pool.split_to(capacity),
        }
    }

    /// Creates a zero-filled view of `capacity` bytes with its own storage.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = BytesMut::with_capacity(capacity);
        buf.resize(capacity, 0);
        Self { buf }
    }

    /// Total writable bytes.
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The destination for the next read.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf[..]
    }

    /// Freezes the view into a read-only slice of its first `n` bytes.
    ///
    /// `n` is clamped to [`size`](Self::size).
    pub fn into_rslice(mut self, n: usize) -> RSlice {
        let n = n.min(self.buf.len());
        self.buf.truncate(n);
        RSlice::from(self.buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_parser_defined() {
        let mut pool = BytesMut::new();
        assert_eq!(WSlice::carve(&mut pool, 128).size(), 128);
        assert_eq!(WSlice::carve(&mut pool, 16).size(), 16);
    }

    #[test]
    fn test_fill_then_bound() {
        let mut w = WSlice::with_capacity(32);
        w.as_mut_slice()[..5].copy_from_slice(b"PING\n");
        let r = w.into_rslice(5);
        assert_eq!(r.as_bytes(), b"PING\n");
    }

    #[test]
    fn test_bound_is_zero_copy() {
        let mut w = WSlice::with_capacity(8);
        let ptr = w.as_mut_slice().as_ptr();
        let r = w.into_rslice(4);
        assert_eq!(r.as_ptr(), ptr);
    }

    #[test]
    fn test_bound_clamps() {
        let w = WSlice::with_capacity(4);
        assert_eq!(w.into_rslice(100).size(), 4);
    }

    #[test]
    fn test_pool_reuses_allocation_once_views_drop() {
        let mut pool = BytesMut::with_capacity(64);
        let first = WSlice::carve(&mut pool, 64);
        let first_ptr = first.buf.as_ptr();
        drop(first.into_rslice(10));

        let second = WSlice::carve(&mut pool, 64);
        assert_eq!(second.buf.as_ptr(), first_ptr);
    }
}
