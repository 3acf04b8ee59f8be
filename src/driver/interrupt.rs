//! Interrupt status decoding
//!
//! [`FirEvents`] parses the extended-mode event register, [`SirCause`] the
//! 16550 interrupt identification register, and [`IsrOutcome`] is what the
//! ISR reports back to the host's interrupt dispatcher.

use crate::internal::register::{ier, iir};

// =============================================================================
// ISR Outcome
// =============================================================================

/// Result of one call to [`NscIrda::isr`](crate::NscIrda::isr)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IsrOutcome {
    /// The interrupt was raised by this adapter
    pub recognized: bool,
    /// The host should schedule [`NscIrda::handle_interrupt`](crate::NscIrda::handle_interrupt)
    pub queue_deferred: bool,
}

impl IsrOutcome {
    /// Not our interrupt
    pub const NOT_OURS: Self = Self {
        recognized: false,
        queue_deferred: false,
    };

    /// Ours, with or without deferred work
    #[inline]
    pub const fn claimed(queue_deferred: bool) -> Self {
        Self {
            recognized: true,
            queue_deferred,
        }
    }
}

// =============================================================================
// FIR/MIR Events
// =============================================================================

/// Event flags from the extended-mode event identification register
///
/// Bit positions match the interrupt enable register, so the raw value is
/// masked with the enable set before decoding.
///
/// # Example
///
/// ```ignore
/// let events = FirEvents::from_raw(eir & int_mask);
/// if events.dma {
///     // transfer reached terminal count
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirEvents {
    /// Line status: a frame ended or a receive error was latched
    pub line_status: bool,
    /// DMA terminal count
    pub dma: bool,
    /// Transmitter empty
    pub tx_empty: bool,
    /// Status FIFO holds an entry
    pub status_fifo: bool,
    /// Settle timer expired
    pub timer: bool,
}

impl FirEvents {
    /// Create from a raw event register value
    #[inline]
    pub fn from_raw(eir: u8) -> Self {
        Self {
            line_status: (eir & ier::LS) != 0,
            dma: (eir & ier::DMA) != 0,
            tx_empty: (eir & ier::TXEMP) != 0,
            status_fifo: (eir & ier::SFIF) != 0,
            timer: (eir & ier::TMR) != 0,
        }
    }

    /// Convert back to register bits
    #[inline]
    pub fn to_raw(&self) -> u8 {
        let mut val = 0u8;
        if self.line_status {
            val |= ier::LS;
        }
        if self.dma {
            val |= ier::DMA;
        }
        if self.tx_empty {
            val |= ier::TXEMP;
        }
        if self.status_fifo {
            val |= ier::SFIF;
        }
        if self.timer {
            val |= ier::TMR;
        }
        val
    }

    /// Check if any event is set
    #[inline]
    pub fn any(&self) -> bool {
        self.line_status || self.dma || self.tx_empty || self.status_fifo || self.timer
    }

    /// Check if the event marks the end of a received frame
    #[inline]
    pub fn frame_end(&self) -> bool {
        self.line_status || self.status_fifo
    }
}

// =============================================================================
// SIR Interrupt Cause
// =============================================================================

/// Highest-priority pending 16550 interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SirCause {
    /// Receiver line status (overrun, parity, framing, break)
    LineStatus,
    /// Receive FIFO reached its trigger level
    RxData,
    /// Receive FIFO holds bytes and went quiet
    CharTimeout,
    /// Transmit holding register empty
    ThrEmpty,
    /// Modem status change
    ModemStatus,
}

impl SirCause {
    /// Decode an IIR value; `None` when no interrupt is pending
    #[inline]
    pub fn from_iir(value: u8) -> Option<Self> {
        if value & iir::NO_INT != 0 {
            return None;
        }
        match value & iir::ID_MASK {
            iir::LINE_STATUS => Some(SirCause::LineStatus),
            iir::RX_DATA => Some(SirCause::RxData),
            iir::CHAR_TIMEOUT => Some(SirCause::CharTimeout),
            iir::THR_EMPTY => Some(SirCause::ThrEmpty),
            iir::MODEM_STATUS => Some(SirCause::ModemStatus),
            _ => None,
        }
    }

    /// Check if the cause means receive data is waiting
    #[inline]
    pub fn is_receive(self) -> bool {
        matches!(self, SirCause::RxData | SirCause::CharTimeout)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
