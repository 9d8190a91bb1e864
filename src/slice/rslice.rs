//! Read-only byte view used on the egress path.

use bytes::{Buf, Bytes};
use std::ops::Deref;

/// A read-only view over bytes held elsewhere.
///
/// Backed by [`Bytes`], so cloning, truncating and advancing never copy the
/// data, and the bytes stay alive for as long as any view of them does. That
/// is what lets a parser queue a slice now and have the session write it
/// later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RSlice {
    bytes: Bytes,
}

impl RSlice {
    /// Creates an empty slice.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a static byte string.
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self {
            bytes: Bytes::from_static(bytes),
        }
    }

    /// Returns a view of the first `n` bytes.
    ///
    /// If `n` exceeds [`size`](Self::size) the whole view is returned.
    pub fn take(&self, n: usize) -> RSlice {
        let n = n.min(self.bytes.len());
        RSlice {
            bytes: self.bytes.slice(..n),
        }
    }

    /// Drops the first `n` bytes from the view.
    ///
    /// Advancing past the end leaves the view empty.
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.bytes.len());
        self.bytes.advance(n);
    }

    /// Returns a view of `range` within this one.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds, like slice indexing.
    pub fn slice(&self, range: impl std::ops::RangeBounds<usize>) -> RSlice {
        RSlice {
            bytes: self.bytes.slice(range),
        }
    }

    /// Number of bytes remaining in the view.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true when no bytes remain.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl Deref for RSlice {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for RSlice {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Bytes> for RSlice {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

impl From<Vec<u8>> for RSlice {
    fn from(v: Vec<u8>) -> Self {
        Self {
            bytes: Bytes::from(v),
        }
    }
}

impl From<&'static [u8]> for RSlice {
    fn from(s: &'static [u8]) -> Self {
        Self::from_static(s)
    }
}
