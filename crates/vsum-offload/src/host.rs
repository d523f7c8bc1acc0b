//! Host-side integer arrays aligned for DMA transfers.
//!
//! Accelerator runtimes move data fastest (and some only move data at all)
//! when the host pointer sits on a 64-byte boundary. [`HostArray`] stores
//! its elements in 64-byte aligned blocks so every array starts aligned
//! regardless of the allocator.

use std::fmt;

/// Alignment of every [`HostArray`] allocation, in bytes.
pub const HOST_ALIGNMENT: usize = 64;

const LANES: usize = HOST_ALIGNMENT / std::mem::size_of::<i32>();

#[repr(C, align(64))]
#[derive(Clone, Copy)]
struct Block([i32; LANES]);

const _: () = assert!(std::mem::size_of::<Block>() == HOST_ALIGNMENT);

/// Fixed-length, 64-byte aligned `i32` array.
#[derive(Clone)]
pub struct HostArray {
    blocks: Vec<Block>,
    len: usize,
}

impl HostArray {
    /// Array of `len` zeros.
    pub fn zeroed(len: usize) -> Self {
        Self { blocks: vec![Block([0; LANES]); len.div_ceil(LANES)], len }
    }

    /// Array whose element `i` is `f(i)`.
    pub fn from_fn(len: usize, mut f: impl FnMut(usize) -> i32) -> Self {
        let mut array = Self::zeroed(len);
        for (i, slot) in array.as_mut_slice().iter_mut().enumerate() {
            *slot = f(i);
        }
        array
    }

    pub fn from_slice(values: &[i32]) -> Self {
        let mut array = Self::zeroed(values.len());
        array.as_mut_slice().copy_from_slice(values);
        array
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the initialized elements in bytes.
    pub fn byte_len(&self) -> usize {
        self.len * std::mem::size_of::<i32>()
    }

    pub fn as_slice(&self) -> &[i32] {
        // SAFETY: `Block` is `repr(C)` over `[i32; LANES]` with no padding,
        // so the blocks form one contiguous run of at least `len` i32s.
        unsafe { std::slice::from_raw_parts(self.blocks.as_ptr().cast::<i32>(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [i32] {
        // SAFETY: see `as_slice`; the unique borrow of `self` covers the blocks.
        unsafe {
            std::slice::from_raw_parts_mut(self.blocks.as_mut_ptr().cast::<i32>(), self.len)
        }
    }
}

impl fmt::Debug for HostArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostArray")
            .field("len", &self.len)
            .field("head", &&self.as_slice()[..self.len.min(8)])
            .finish()
    }
}

impl PartialEq for HostArray {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for HostArray {}
