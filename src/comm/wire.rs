//! Fixed little-endian wire encoding for partitioner exchanges.
//!
//! All multi-byte integers are **little-endian** on the wire. Bulk payloads
//! are Pod slices written with a leading `u64` element count. Receivers must
//! consume records exactly; a short buffer is a protocol error, not EOF.

use crate::error::AmorphError;
use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

/// Append-only encoder for one send buffer.
#[derive(Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a Pod value verbatim (caller guarantees an LE-stable layout).
    #[inline]
    pub fn put_pod<T: Pod>(&mut self, v: &T) {
        self.buf.extend_from_slice(bytemuck::bytes_of(v));
    }

    /// Write `u64` element count, then the slice contents.
    ///
    /// Zero-sized payloads (`()` edge data) encode as the count alone.
    pub fn put_pod_slice<T: Pod>(&mut self, v: &[T]) {
        self.put_u64(v.len() as u64);
        if size_of::<T>() != 0 {
            self.buf.extend_from_slice(bytemuck::cast_slice(v));
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor-based decoder over one received buffer.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], AmorphError> {
        if self.remaining() < n {
            return Err(AmorphError::WireUnderrun {
                wanted: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn get_u32(&mut self) -> Result<u32, AmorphError> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes(b.try_into().unwrap()))
    }

    pub fn get_u64(&mut self) -> Result<u64, AmorphError> {
        let b = self.bytes(8)?;
        Ok(u64::from_le_bytes(b.try_into().unwrap()))
    }

    /// Read a Pod value written with [`WireWriter::put_pod`].
    pub fn get_pod<T: Pod + Zeroable>(&mut self) -> Result<T, AmorphError> {
        let b = self.bytes(size_of::<T>())?;
        let mut out = T::zeroed();
        bytemuck::bytes_of_mut(&mut out).copy_from_slice(b);
        Ok(out)
    }

    /// Read a slice written with [`WireWriter::put_pod_slice`].
    ///
    /// Copies into an owned, properly aligned vector; the source buffer may
    /// sit at any byte offset.
    pub fn get_pod_vec<T: Pod + Zeroable>(&mut self) -> Result<Vec<T>, AmorphError> {
        let n = self.get_u64()? as usize;
        if size_of::<T>() == 0 {
            return Ok(vec![T::zeroed(); n]);
        }
        let b = self.bytes(n * size_of::<T>())?;
        let mut out = vec![T::zeroed(); n];
        bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(b);
        Ok(out)
    }
}

// ===== Exchange headers ====================================================

/// Leading record of a metadata-exchange message: the node and edge counts
/// the receiver folds into its ownership totals.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireMetaHdr {
    pub num_nodes_le: u32,
    pub _pad: u32, // keep num_edges 8-byte aligned; always zero
    pub num_edges_le: u64,
}

impl WireMetaHdr {
    pub fn new(num_nodes: u32, num_edges: u64) -> Self {
        Self {
            num_nodes_le: num_nodes.to_le(),
            _pad: 0,
            num_edges_le: num_edges.to_le(),
        }
    }
    pub fn num_nodes(&self) -> u32 {
        u32::from_le(self.num_nodes_le)
    }
    pub fn num_edges(&self) -> u64 {
        u64::from_le(self.num_edges_le)
    }
}

const _: () = {
    assert!(size_of::<WireMetaHdr>() == 16);
};
