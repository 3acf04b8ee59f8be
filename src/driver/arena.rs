//! Receive data arena
//!
//! Backing bytes for the sixteen SIR buffers and the FIR DMA ring. The
//! arena sits outside both locks: access is governed by ownership recorded
//! in the [`RxPool`](super::rx_pool::RxPool), and every accessor hands out a
//! reference to exactly the bytes its caller owns, never to the whole array.

use core::cell::UnsafeCell;

use crate::internal::constants::{MAX_RCV_DATA_SIZE, NUM_RCV_BUFS, RCV_DMA_SIZE};

use super::rx_pool::Span;

/// SIR buffers plus the DMA ring
pub struct RxArena {
    sir: UnsafeCell<[[u8; MAX_RCV_DATA_SIZE]; NUM_RCV_BUFS]>,
    ring: UnsafeCell<[u8; RCV_DMA_SIZE]>,
}

// SAFETY: the arena hands out references only to buffers or ring spans the
// caller owns through the pool (framer read buffer, a slot in transit, a
// pending lease, or the active DMA window). Those owners are disjoint.
unsafe impl Sync for RxArena {}

impl Default for RxArena {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for RxArena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RxArena")
            .field("sir_buffers", &NUM_RCV_BUFS)
            .field("ring_len", &RCV_DMA_SIZE)
            .finish()
    }
}

impl RxArena {
    /// Zeroed arena
    pub const fn new() -> Self {
        Self {
            sir: UnsafeCell::new([[0; MAX_RCV_DATA_SIZE]; NUM_RCV_BUFS]),
            ring: UnsafeCell::new([0; RCV_DMA_SIZE]),
        }
    }

    /// Ring length in bytes
    pub const fn ring_len(&self) -> usize {
        RCV_DMA_SIZE
    }

    /// Mutable view of SIR buffer `index`
    ///
    /// # Safety
    ///
    /// The caller must own buffer `index` (the framer's read buffer) and no
    /// other reference to it may be live.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn sir_buffer_mut(&self, index: u8) -> &mut [u8] {
        let index = usize::from(index);
        assert!(index < NUM_RCV_BUFS);
        let base = self.sir.get().cast::<[u8; MAX_RCV_DATA_SIZE]>();
        // SAFETY: index is in bounds; exclusivity is the caller's contract.
        unsafe { &mut *base.add(index) }
    }

    /// First `len` bytes of SIR buffer `index`
    ///
    /// # Safety
    ///
    /// Buffer `index` must be attached to a slot the caller holds, so that
    /// nothing writes it while the reference is live.
    pub unsafe fn sir_buffer(&self, index: u8, len: usize) -> &[u8] {
        let index = usize::from(index);
        assert!(index < NUM_RCV_BUFS);
        let base = self.sir.get().cast::<[u8; MAX_RCV_DATA_SIZE]>();
        // SAFETY: index is in bounds; no writer per the caller's contract.
        let buf = unsafe { &*base.add(index) };
        &buf[..len.min(MAX_RCV_DATA_SIZE)]
    }

    /// Mutable view of the ring window `span`
    ///
    /// # Safety
    ///
    /// `span` must not overlap any full or pending lease, and no other
    /// reference into it may be live (it is the receive DMA window).
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn ring_window_mut(&self, span: Span) -> &mut [u8] {
        assert!(span.end() <= RCV_DMA_SIZE);
        let base = self.ring.get().cast::<u8>();
        // SAFETY: span is in bounds; exclusivity is the caller's contract.
        unsafe { core::slice::from_raw_parts_mut(base.add(span.offset), span.len) }
    }

    /// Read-only view of a leased ring span
    ///
    /// # Safety
    ///
    /// `span` must be leased by a slot the caller holds, so the receive DMA
    /// window cannot cover it while the reference is live.
    pub unsafe fn ring_span(&self, span: Span) -> &[u8] {
        assert!(span.end() <= RCV_DMA_SIZE);
        let base = self.ring.get().cast::<u8>().cast_const();
        // SAFETY: span is in bounds; no writer per the caller's contract.
        unsafe { core::slice::from_raw_parts(base.add(span.offset), span.len) }
    }
}
