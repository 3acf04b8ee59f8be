//! Fixed-capacity circular queue of slot indices.
//!
//! Backs the receive pool's free/full/pending/spare lists. Entries are small
//! indices, so the queue never holds pointers into the slots it tracks.

/// Circular queue of `u8` indices with wraparound head.
#[derive(Debug, Clone)]
pub struct IndexRing<const N: usize> {
    /// Backing storage
    entries: [u8; N],
    /// Index of the first entry
    head: usize,
    /// Number of valid entries
    len: usize,
}

impl<const N: usize> IndexRing<N> {
    /// Create an empty ring
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [0; N],
            head: 0,
            len: 0,
        }
    }

    /// Create a ring holding `0..count` in order
    #[must_use]
    pub fn filled(count: usize) -> Self {
        let mut ring = Self::new();
        for index in 0..count.min(N) {
            // Capacity checked by the range bound.
            let _ = ring.push_back(index as u8);
        }
        ring
    }

    /// Number of queued entries
    #[inline(always)]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if no entries are queued
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the ring is at capacity
    #[inline(always)]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    #[inline(always)]
    const fn slot(&self, position: usize) -> usize {
        (self.head + position) % N
    }

    /// Append at the tail; returns the index back when full
    pub fn push_back(&mut self, index: u8) -> Result<(), u8> {
        if self.is_full() {
            return Err(index);
        }
        let tail = self.slot(self.len);
        self.entries[tail] = index;
        self.len += 1;
        Ok(())
    }

    /// Insert at the head; returns the index back when full
    pub fn push_front(&mut self, index: u8) -> Result<(), u8> {
        if self.is_full() {
            return Err(index);
        }
        self.head = (self.head + N - 1) % N;
        self.entries[self.head] = index;
        self.len += 1;
        Ok(())
    }

    /// Remove the head entry
    pub fn pop_front(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let index = self.entries[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(index)
    }

    /// Peek at the head entry
    #[must_use]
    pub fn front(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.entries[self.head])
        }
    }

    /// Insert keeping entries ordered by `key`, after any equal keys
    pub fn insert_sorted<K, F>(&mut self, index: u8, key: F) -> Result<(), u8>
    where
        K: Ord,
        F: Fn(u8) -> K,
    {
        if self.is_full() {
            return Err(index);
        }
        let new_key = key(index);
        let mut position = self.len;
        for pos in 0..self.len {
            if key(self.entries[self.slot(pos)]) > new_key {
                position = pos;
                break;
            }
        }
        // Shift the tail one place right to open `position`.
        let mut pos = self.len;
        while pos > position {
            let to = self.slot(pos);
            let from = self.slot(pos - 1);
            self.entries[to] = self.entries[from];
            pos -= 1;
        }
        let at = self.slot(position);
        self.entries[at] = index;
        self.len += 1;
        Ok(())
    }

    /// Remove the first occurrence of `index`; returns whether it was present
    pub fn remove(&mut self, index: u8) -> bool {
        let Some(position) = (0..self.len).find(|&pos| self.entries[self.slot(pos)] == index) else {
            return false;
        };
        for pos in position..self.len - 1 {
            let to = self.slot(pos);
            let from = self.slot(pos + 1);
            self.entries[to] = self.entries[from];
        }
        self.len -= 1;
        true
    }

    /// Check whether `index` is queued
    #[must_use]
    pub fn contains(&self, index: u8) -> bool {
        self.iter().any(|entry| entry == index)
    }

    /// Iterate head to tail
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).map(move |pos| self.entries[self.slot(pos)])
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for IndexRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    fn collect<const N: usize>(ring: &IndexRing<N>) -> Vec<u8> {
        ring.iter().collect()
    }

    #[test]
    fn push_pop_is_fifo() {
        let mut ring: IndexRing<4> = IndexRing::new();
        ring.push_back(1).unwrap();
        ring.push_back(2).unwrap();
        ring.push_back(3).unwrap();

        assert_eq!(ring.pop_front(), Some(1));
        assert_eq!(ring.pop_front(), Some(2));
        assert_eq!(ring.pop_front(), Some(3));
        assert_eq!(ring.pop_front(), None);
    }

    #[test]
    fn full_ring_rejects_push() {
        let mut ring = IndexRing::<2>::filled(2);
        assert!(ring.is_full());
        assert_eq!(ring.push_back(9), Err(9));
        assert_eq!(ring.push_front(9), Err(9));
    }

    #[test]
    fn push_front_wraps_head() {
        let mut ring: IndexRing<4> = IndexRing::new();
        ring.push_back(5).unwrap();
        ring.push_front(4).unwrap();
        ring.push_front(3).unwrap();

        assert_eq!(collect(&ring), [3, 4, 5]);
        assert_eq!(ring.front(), Some(3));
    }

    #[test]
    fn wraparound_after_many_cycles() {
        let mut ring: IndexRing<3> = IndexRing::new();
        for round in 0..10u8 {
            ring.push_back(round).unwrap();
            ring.push_back(round + 100).unwrap();
            assert_eq!(ring.pop_front(), Some(round));
            assert_eq!(ring.pop_front(), Some(round + 100));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn insert_sorted_keeps_order() {
        let mut ring: IndexRing<8> = IndexRing::new();
        for index in [5u8, 1, 7, 3] {
            ring.insert_sorted(index, |i| i).unwrap();
        }
        assert_eq!(collect(&ring), [1, 3, 5, 7]);
    }

    #[test]
    fn insert_sorted_across_wrapped_head() {
        let mut ring: IndexRing<4> = IndexRing::new();
        ring.push_back(0).unwrap();
        ring.push_back(0).unwrap();
        ring.pop_front();
        ring.pop_front();
        ring.insert_sorted(6, |i| i).unwrap();
        ring.insert_sorted(2, |i| i).unwrap();
        ring.insert_sorted(4, |i| i).unwrap();
        assert_eq!(collect(&ring), [2, 4, 6]);
    }

    #[test]
    fn remove_middle_entry() {
        let mut ring = IndexRing::<6>::filled(5);
        assert!(ring.remove(2));
        assert!(!ring.remove(2));
        assert_eq!(collect(&ring), [0, 1, 3, 4]);
        assert!(!ring.contains(2));
        assert!(ring.contains(4));
    }

    #[test]
    fn clear_empties_ring() {
        let mut ring = IndexRing::<4>::filled(4);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.front(), None);
    }
}
