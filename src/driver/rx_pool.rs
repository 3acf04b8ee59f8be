//! Receive buffer pool
//!
//! Sixteen slots cycle `Free -> Full -> Pending -> Free`. A slot's data is
//! either one of the sixteen discrete SIR buffers or a lease on a span of
//! the FIR DMA ring. Slot identities live in index rings instead of linked
//! lists:
//!
//! | List    | Holds                                         |
//! |---------|-----------------------------------------------|
//! | `free`  | idle slots                                    |
//! | `full`  | completed frames awaiting delivery (FIFO)     |
//! | `pend`  | slots held by the protocol, sorted by storage |
//! | `spare` | SIR data buffers not attached to any slot     |
//!
//! The pool lives inside the interrupt lock; the ISR is its only lock-free
//! user.

use log::warn;

use crate::internal::constants::NUM_RCV_BUFS;
use crate::internal::ring::IndexRing;

/// Slot ownership state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotState {
    /// Idle
    #[default]
    Free,
    /// Holds a completed, undelivered frame
    Full,
    /// Handed to the protocol
    Pending,
}

/// Where a slot's bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxStorage {
    /// No data attached
    #[default]
    Empty,
    /// Discrete SIR buffer (owned by the slot until release)
    Sir(u8),
    /// Lease on the DMA ring starting at `offset`
    Dma {
        /// Ring offset of the first byte
        offset: usize,
    },
}

/// One receive slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxSlot {
    /// Ownership state
    pub state: SlotState,
    /// Data location
    pub storage: RxStorage,
    /// Frame length in bytes
    pub len: usize,
}

impl RxSlot {
    /// Ring span leased by this slot, if it holds DMA data
    pub fn dma_span(&self) -> Option<Span> {
        match self.storage {
            RxStorage::Dma { offset } => Some(Span::new(offset, self.len)),
            _ => None,
        }
    }
}

/// Contiguous byte range of the DMA ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Span {
    /// First byte
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
}

impl Span {
    /// Create a span
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// One past the last byte
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Check if two spans share a byte
    pub const fn overlaps(&self, other: &Span) -> bool {
        self.len > 0 && other.len > 0 && self.offset < other.end() && other.offset < self.end()
    }
}

/// Largest gap in a ring of `ring_len` bytes not covered by `occupied`
///
/// `occupied` is sorted in place. Ties go to the gap found first (lowest
/// offset). A fully occupied ring yields a zero-length span.
pub fn find_largest_space(occupied: &mut [Span], ring_len: usize) -> Span {
    occupied.sort_unstable_by_key(|s| s.offset);

    let mut best = Span::default();
    let mut cursor = 0;
    for span in occupied.iter().filter(|s| s.len > 0) {
        if span.offset > cursor {
            let gap = Span::new(cursor, span.offset - cursor);
            if gap.len > best.len {
                best = gap;
            }
        }
        cursor = cursor.max(span.end());
    }
    if ring_len > cursor {
        let gap = Span::new(cursor, ring_len - cursor);
        if gap.len > best.len {
            best = gap;
        }
    }
    best
}

/// Slot bookkeeping
#[derive(Debug, Clone)]
pub struct RxPool {
    slots: [RxSlot; NUM_RCV_BUFS],
    free: IndexRing<NUM_RCV_BUFS>,
    full: IndexRing<NUM_RCV_BUFS>,
    pend: IndexRing<NUM_RCV_BUFS>,
    spare: IndexRing<NUM_RCV_BUFS>,
    read_buf: Option<u8>,
}

impl Default for RxPool {
    fn default() -> Self {
        Self::new()
    }
}

fn storage_key(slot: &RxSlot) -> usize {
    match slot.storage {
        RxStorage::Dma { offset } => offset,
        RxStorage::Sir(buf) => usize::from(buf),
        RxStorage::Empty => usize::MAX,
    }
}

impl RxPool {
    /// All slots free, all SIR buffers spare except the framer's read buffer
    pub fn new() -> Self {
        let mut spare = IndexRing::filled(NUM_RCV_BUFS);
        let read_buf = spare.pop_front();
        Self {
            slots: [RxSlot::default(); NUM_RCV_BUFS],
            free: IndexRing::filled(NUM_RCV_BUFS),
            full: IndexRing::new(),
            pend: IndexRing::new(),
            spare,
            read_buf,
        }
    }

    /// Slot `index`
    pub fn slot(&self, index: u8) -> &RxSlot {
        &self.slots[usize::from(index)]
    }

    /// SIR buffer the receive framer is filling
    pub fn read_buffer(&self) -> Option<u8> {
        self.read_buf
    }

    /// Number of idle slots
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of undelivered frames
    pub fn full_count(&self) -> usize {
        self.full.len()
    }

    /// Number of slots held by the protocol
    pub fn pending_count(&self) -> usize {
        self.pend.len()
    }

    /// Attach a completed frame to a free slot and queue it for delivery
    ///
    /// Returns the storage back when no slot is free.
    pub fn queue_frame(&mut self, storage: RxStorage, len: usize) -> Result<u8, RxStorage> {
        let Some(index) = self.free.pop_front() else {
            return Err(storage);
        };
        self.slots[usize::from(index)] = RxSlot {
            state: SlotState::Full,
            storage,
            len,
        };
        // capacity equals the slot count, so this cannot overflow
        let _ = self.full.push_back(index);
        Ok(index)
    }

    /// Hand the framer's read buffer to a slot and give the framer a spare
    ///
    /// Returns false (frame dropped, read buffer kept) when there is no free
    /// slot or no spare buffer to continue receiving into.
    pub fn complete_sir_frame(&mut self, len: usize) -> bool {
        let Some(buf) = self.read_buf else {
            return false;
        };
        if self.free.is_empty() || self.spare.is_empty() {
            return false;
        }
        match self.queue_frame(RxStorage::Sir(buf), len) {
            Ok(_) => {
                self.read_buf = self.spare.pop_front();
                true
            }
            Err(_) => false,
        }
    }

    /// Oldest undelivered frame, removed from the full list
    ///
    /// The slot keeps its `Full` state (and any DMA lease) until it is
    /// either marked pending or released.
    pub fn pop_full(&mut self) -> Option<u8> {
        self.full.pop_front()
    }

    /// Record that a popped slot is now held by the protocol
    pub fn mark_pending(&mut self, index: u8) {
        let slot = &mut self.slots[usize::from(index)];
        debug_assert_eq!(slot.state, SlotState::Full);
        slot.state = SlotState::Pending;
        let slots = &self.slots;
        let _ = self
            .pend
            .insert_sorted(index, |i| storage_key(&slots[usize::from(i)]));
    }

    /// Return a popped, undelivered slot to the free list
    pub fn release(&mut self, index: u8) {
        let slot = &mut self.slots[usize::from(index)];
        debug_assert_eq!(slot.state, SlotState::Full);
        if let RxStorage::Sir(buf) = slot.storage {
            let _ = self.spare.push_back(buf);
        }
        *slot = RxSlot::default();
        let _ = self.free.push_front(index);
    }

    /// Take back a slot the protocol has returned
    ///
    /// Returns the released storage, or `None` if the slot was not pending.
    pub fn return_pending(&mut self, index: u8) -> Option<RxStorage> {
        if usize::from(index) >= NUM_RCV_BUFS || !self.pend.remove(index) {
            warn!("return of receive slot {index} that is not pending");
            return None;
        }
        let slot = &mut self.slots[usize::from(index)];
        let storage = slot.storage;
        if let RxStorage::Sir(buf) = storage {
            let _ = self.spare.push_back(buf);
        }
        *slot = RxSlot::default();
        let _ = self.free.push_back(index);
        Some(storage)
    }

    /// Collect the DMA leases of full and pending slots into `out`
    ///
    /// Returns the number of spans written.
    pub fn occupied_dma_spans(&self, out: &mut [Span; NUM_RCV_BUFS]) -> usize {
        let mut n = 0;
        for slot in &self.slots {
            if matches!(slot.state, SlotState::Full | SlotState::Pending) {
                if let Some(span) = slot.dma_span() {
                    out[n] = span;
                    n += 1;
                }
            }
        }
        n
    }

    /// Largest ring span not leased by any full or pending slot
    pub fn largest_free_span(&self, ring_len: usize) -> Span {
        let mut spans = [Span::default(); NUM_RCV_BUFS];
        let n = self.occupied_dma_spans(&mut spans);
        find_largest_space(&mut spans[..n], ring_len)
    }

    /// Slot indices in delivery order
    pub fn full_indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.full.iter()
    }

    /// Slot indices held by the protocol, in storage order
    pub fn pending_indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.pend.iter()
    }

    /// Check that every slot and SIR buffer is accounted for exactly once
    ///
    /// Holds between operations; a slot popped with [`pop_full`](Self::pop_full)
    /// and not yet marked or released is counted as missing.
    pub fn is_conserved(&self) -> bool {
        let mut seen = [false; NUM_RCV_BUFS];
        let lists = [
            (&self.free, SlotState::Free),
            (&self.full, SlotState::Full),
            (&self.pend, SlotState::Pending),
        ];
        for (list, state) in lists {
            for index in list.iter() {
                let i = usize::from(index);
                if i >= NUM_RCV_BUFS || seen[i] || self.slots[i].state != state {
                    return false;
                }
                seen[i] = true;
            }
        }
        if !seen.iter().all(|&s| s) {
            return false;
        }

        let mut bufs = [false; NUM_RCV_BUFS];
        let attached = self.slots.iter().filter_map(|s| match s.storage {
            RxStorage::Sir(b) => Some(b),
            _ => None,
        });
        for buf in self.spare.iter().chain(self.read_buf).chain(attached) {
            let b = usize::from(buf);
            if b >= NUM_RCV_BUFS || bufs[b] {
                return false;
            }
            bufs[b] = true;
        }
        bufs.iter().all(|&b| b)
    }
}
