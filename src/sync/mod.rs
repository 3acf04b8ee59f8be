//! Synchronization Support
//!
//! The engine runs in three contexts: the ISR, the deferred callback (DPC),
//! and thread-level calls from the protocol stack. This module provides the
//! two lock wrappers that make the split explicit in the type system:
//!
//! - [`InterruptLock`] - state the ISR touches; others reach it through the
//!   interrupt-synchronization primitive
//! - [`QueueLock`] - the send queue and coordinator state, never touched by
//!   the ISR
//!
//! # Example
//!
//! ```ignore
//! use nsc_irda::sync::{InterruptLock, QueueLock};
//!
//! static COUNTERS: InterruptLock<u32> = InterruptLock::new(0);
//!
//! fn isr() {
//!     COUNTERS.with(|c| *c += 1);
//! }
//! ```

mod primitives;

pub use primitives::{InterruptLock, QueueLock};
