//! Port I/O and banked register access
//!
//! The NSC controller multiplexes eight register banks onto an eight-byte I/O
//! window. Selecting a bank and touching one of its registers are two separate
//! port operations, so any sequence that leaves bank 0 must not interleave with
//! the ISR, which always assumes bank 0.

use crate::internal::register::{BANK_SELECT, BSR, BSR_BKSE, NUM_BANKS, REGS_PER_BANK};

// =============================================================================
// Port I/O Trait
// =============================================================================

/// Raw 8-bit port access to the adapter's I/O window
///
/// Implemented by the host platform (`inb`/`outb`, a memory-mapped window, or
/// a test double). Offsets are relative to the port base and lie in `0..8`.
pub trait PortIo {
    /// Read one byte from `offset`
    fn read(&self, offset: u8) -> u8;

    /// Write one byte to `offset`
    fn write(&self, offset: u8, value: u8);
}

impl<T: PortIo + ?Sized> PortIo for &T {
    fn read(&self, offset: u8) -> u8 {
        (**self).read(offset)
    }

    fn write(&self, offset: u8, value: u8) {
        (**self).write(offset, value);
    }
}

// =============================================================================
// Banked Port
// =============================================================================

/// Banked register file on top of a [`PortIo`]
///
/// The plain `read_bank_reg`/`write_bank_reg` accessors assume the caller is
/// already synchronized with the interrupt (the ISR itself, or code inside an
/// [`InterruptLock`](crate::sync::InterruptLock) closure). The `sync_*`
/// variants take the critical section themselves.
#[derive(Debug)]
pub struct BankedPort<B> {
    io: B,
}

impl<B: PortIo> BankedPort<B> {
    /// Wrap a port window
    pub const fn new(io: B) -> Self {
        Self { io }
    }

    /// Borrow the underlying port
    pub fn io(&self) -> &B {
        &self.io
    }

    /// Read a bank 0 register directly
    #[inline]
    pub fn read(&self, offset: u8) -> u8 {
        self.io.read(offset)
    }

    /// Write a bank 0 register directly
    #[inline]
    pub fn write(&self, offset: u8, value: u8) {
        self.io.write(offset, value);
    }

    /// Read `reg` of `bank`, leaving bank 0 selected
    pub fn read_bank_reg(&self, bank: u8, reg: u8) -> u8 {
        debug_assert!(bank < NUM_BANKS && reg < REGS_PER_BANK);
        self.select_bank(bank);
        let value = self.io.read(reg);
        self.select_bank(0);
        value
    }

    /// Write `value` to `reg` of `bank`, leaving bank 0 selected
    pub fn write_bank_reg(&self, bank: u8, reg: u8, value: u8) {
        debug_assert!(bank < NUM_BANKS && reg < REGS_PER_BANK);
        self.select_bank(bank);
        self.io.write(reg, value);
        self.select_bank(0);
    }

    /// Read-modify-write `reg` of `bank`
    pub fn modify_bank_reg<F>(&self, bank: u8, reg: u8, f: F)
    where
        F: FnOnce(u8) -> u8,
    {
        debug_assert!(bank < NUM_BANKS && reg < REGS_PER_BANK);
        self.select_bank(bank);
        let value = self.io.read(reg);
        self.io.write(reg, f(value));
        self.select_bank(0);
    }

    /// [`read_bank_reg`](Self::read_bank_reg) under interrupt synchronization
    pub fn sync_read_bank_reg(&self, bank: u8, reg: u8) -> u8 {
        critical_section::with(|_| self.read_bank_reg(bank, reg))
    }

    /// [`write_bank_reg`](Self::write_bank_reg) under interrupt synchronization
    pub fn sync_write_bank_reg(&self, bank: u8, reg: u8, value: u8) {
        critical_section::with(|_| self.write_bank_reg(bank, reg, value));
    }

    /// [`modify_bank_reg`](Self::modify_bank_reg) under interrupt synchronization
    pub fn sync_modify_bank_reg<F>(&self, bank: u8, reg: u8, f: F)
    where
        F: FnOnce(u8) -> u8,
    {
        critical_section::with(|_| self.modify_bank_reg(bank, reg, f));
    }

    /// Check that bank 0 is currently selected
    pub fn bank0_selected(&self) -> bool {
        self.io.read(BSR) & BSR_BKSE == 0
    }

    fn select_bank(&self, bank: u8) {
        self.io.write(BSR, BANK_SELECT[bank as usize]);
    }
}

// =============================================================================
// Tests
// =============================================================================
