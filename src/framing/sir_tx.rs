//! SIR transmit stepper
//!
//! Feeds a pre-built, escaped SIR frame into the UART one FIFO burst per
//! transmit-holding-register-empty interrupt.

use log::{trace, warn};

use crate::hal::{BankedPort, PortIo};
use crate::internal::constants::{
    MAX_IRDA_DATA_SIZE, MAX_SIR_SPEED, SIR_BOF, SIR_TX_POLL_LIMIT, SIR_TX_POLL_LIMIT_FAST,
    SIR_TX_SHIFT_EMPTY_POLLS,
};
use crate::internal::register::{bank0, lsr};

/// Result of one transmit step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStep {
    /// Bytes remain; wait for the next THR-empty interrupt
    MoreToSend,
    /// The last byte has been written
    Done,
}

/// LSR poll bound for a burst at `bits_per_sec`
///
/// The larger bound applies only above the SIR range.
pub const fn poll_limit_for(bits_per_sec: u32) -> u32 {
    if bits_per_sec > MAX_SIR_SPEED {
        SIR_TX_POLL_LIMIT_FAST
    } else {
        SIR_TX_POLL_LIMIT
    }
}

/// Outgoing SIR frame and its write cursor
pub struct SirTransmitter {
    buf: [u8; MAX_IRDA_DATA_SIZE],
    len: usize,
    pos: usize,
    flush: bool,
}

impl Default for SirTransmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SirTransmitter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SirTransmitter")
            .field("len", &self.len)
            .field("pos", &self.pos)
            .field("flush", &self.flush)
            .finish()
    }
}

impl SirTransmitter {
    /// Create an idle transmitter
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_IRDA_DATA_SIZE],
            len: 0,
            pos: 0,
            flush: false,
        }
    }

    /// Frame buffer to build the next frame into
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Arm a frame of `len` bytes already written to [`buffer_mut`](Self::buffer_mut)
    ///
    /// With `flush` set the last byte is pushed out of the shift register
    /// before the step reports [`TxStep::Done`].
    pub fn load(&mut self, len: usize, flush: bool) {
        self.len = len.min(self.buf.len());
        self.pos = 0;
        self.flush = flush;
    }

    /// Set or clear the flush-on-last-byte flag of the loaded frame
    pub fn set_flush(&mut self, flush: bool) {
        self.flush = flush;
    }

    /// Check if a loaded frame still has bytes to write
    pub fn is_pending(&self) -> bool {
        self.pos < self.len
    }

    /// Bytes of the loaded frame not yet written
    pub fn remaining(&self) -> usize {
        self.len - self.pos
    }

    /// Loaded frame bytes
    pub fn frame(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Drop the loaded frame
    pub fn clear(&mut self) {
        self.len = 0;
        self.pos = 0;
        self.flush = false;
    }

    /// Write up to `burst` bytes to the UART
    ///
    /// Each byte waits for THR empty for at most `poll_limit` LSR reads; a
    /// timeout ends the burst early. Must run synchronized with the ISR.
    pub fn step<B: PortIo>(&mut self, port: &BankedPort<B>, burst: usize, poll_limit: u32) -> TxStep {
        let burst = burst.max(1);
        for _ in 0..burst {
            if self.pos >= self.len {
                break;
            }
            if !poll_lsr(port, lsr::TXRDY, poll_limit) {
                trace!("SIR THR not empty after {poll_limit} polls");
                break;
            }
            port.write(bank0::RXD_TXD, self.buf[self.pos]);
            self.pos += 1;
        }

        if self.pos < self.len {
            return TxStep::MoreToSend;
        }

        if self.flush {
            if !poll_lsr(port, lsr::TXEMP, SIR_TX_SHIFT_EMPTY_POLLS) {
                warn!("SIR shift register did not drain before speed change");
            }
            port.write(bank0::RXD_TXD, SIR_BOF);
            self.flush = false;
        }
        TxStep::Done
    }
}

fn poll_lsr<B: PortIo>(port: &BankedPort<B>, mask: u8, limit: u32) -> bool {
    (0..limit.max(1)).any(|_| port.read(bank0::LSR) & mask != 0)
}
