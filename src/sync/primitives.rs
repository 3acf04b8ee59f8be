//! Lock wrappers for the three execution contexts.
//!
//! The adapter state is split by who may touch it:
//!
//! | Wrapper              | Backing                                 | Used by                           |
//! |----------------------|-----------------------------------------|-----------------------------------|
//! | [`InterruptLock<T>`] | `critical_section::Mutex<RefCell<T>>`   | ISR directly; DPC/thread via sync |
//! | [`QueueLock<T>`]     | `spin::Mutex<T>`                        | DPC and thread level only         |
//!
//! Lock order is `QueueLock` then `InterruptLock`, never the reverse.

use core::cell::RefCell;
use critical_section::Mutex;

/// State shared with the interrupt handler.
///
/// Every access runs with the device interrupt masked, which is how thread
/// and DPC code synchronize with the ISR.
pub struct InterruptLock<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> InterruptLock<T> {
    /// Create a new lock (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Execute a closure with exclusive mutable access.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            let mut value = self.inner.borrow_ref_mut(cs);
            f(&mut value)
        })
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut value| f(&mut value))
        })
    }
}

/// State serialized by the adapter's queue spinlock.
///
/// Never taken from the ISR.
pub struct QueueLock<T> {
    inner: spin::Mutex<T>,
}

impl<T> QueueLock<T> {
    /// Create a new lock (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            inner: spin::Mutex::new(value),
        }
    }

    /// Acquire the lock, spinning until it is free.
    #[inline]
    pub fn lock(&self) -> spin::MutexGuard<'_, T> {
        self.inner.lock()
    }

    /// Execute a closure with the lock held.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Check whether the lock is currently held.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_lock_with_mutates() {
        let lock = InterruptLock::new(0u32);
        lock.with(|v| *v += 5);
        assert_eq!(lock.with(|v| *v), 5);
    }

    #[test]
    fn interrupt_lock_try_with_fails_while_borrowed() {
        let lock = InterruptLock::new(1u8);
        let nested = lock.with(|_| lock.try_with(|v| *v));
        assert_eq!(nested, None);
        assert_eq!(lock.try_with(|v| *v), Some(1));
    }

    #[test]
    fn interrupt_lock_static_usage() {
        static COUNTER: InterruptLock<u32> = InterruptLock::new(0);
        COUNTER.with(|v| *v += 1);
        assert!(COUNTER.with(|v| *v) >= 1);
    }

    #[test]
    fn queue_lock_guard_releases_on_drop() {
        let lock = QueueLock::new([0u8; 4]);
        {
            let mut guard = lock.lock();
            guard[1] = 7;
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
        assert_eq!(lock.with(|v| v[1]), 7);
    }
}
