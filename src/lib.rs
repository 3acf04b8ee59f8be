//! NSC IrDA Miniport Engine
//!
//! A `no_std`, `no_alloc` Rust implementation of the transmit/receive engine
//! for the National Semiconductor PC87108, PC87308 and PC87338 infrared
//! controllers.
//!
//! The controller is a 16550-compatible UART with an extended register file
//! (eight banks behind an eight-byte I/O window) and a single host DMA
//! channel shared between receive and transmit.
//!
//! # Architecture
//!
//! The engine is organized into four layers:
//!
//! 1. **Adapter** ([`driver`]): bring-up, send queue, speed coordinator,
//!    receive delivery, query/set information, ISR and deferred callback
//! 2. **Framing** ([`framing`]): SIR byte stuffing, FCS-16, the receive
//!    framer and the THR-empty transmitter
//! 3. **Transceivers** ([`dongle`]): signature probe and per-vendor mode
//!    switching
//! 4. **HAL** ([`hal`]): banked port access and DMA transfer bookkeeping
//!
//! The host platform supplies the port window ([`PortIo`]), the DMA channel
//! ([`DmaChannel`]), the NDIS upcalls ([`NdisHost`]), a busy-wait delay
//! ([`embedded_hal::delay::DelayNs`]) and a `critical-section`
//! implementation.
//!
//! ## Speeds
//!
//! - **SIR**: 2400 to 115200 bps, byte-at-a-time through the UART FIFO
//! - **MIR**: 576 kbps and 1.152 Mbps, DMA frames with a 16-bit CRC
//! - **FIR**: 4 Mbps, DMA frames with a 32-bit CRC
//!
//! # Features
//!
//! - `defmt`: Enable defmt formatting for error and status types
//!
//! # Example
//!
//! ```ignore
//! use nsc_irda::{AdapterConfig, BoardType, NscIrda};
//! use nsc_irda::dongle::DongleVendor;
//!
//! let config = AdapterConfig::new()
//!     .with_board(BoardType::Pc87338)
//!     .with_dongle_types(DongleVendor::Hp, DongleVendor::GenericSir);
//!
//! let adapter = NscIrda::new(port, dma, host, delay, config);
//! adapter.initialize()?;
//!
//! // From the interrupt vector:
//! if adapter.isr().queue_deferred {
//!     // schedule adapter.handle_interrupt()
//! }
//! ```
//!
//! # Memory Requirements
//!
//! The receive arena (a ring for DMA frames plus one buffer per SIR slot)
//! and the two transmit buffers live inside [`NscIrda`]: about 60 KB.

#![no_std]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]

// =============================================================================
// Modules
// =============================================================================

pub mod dongle;
pub mod driver;
pub mod error;
pub mod framing;
pub mod hal;
pub mod host;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
mod test_utils;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::{
    AdapterConfig, BaudRate, BoardType, HardwareStatus, IsrOutcome, NscIrda, OidError, RegStats,
    ResetStatus,
};
pub use error::{
    ConfigError, ConfigResult, DmaError, DmaResult, DongleError, DongleResult, Error, IoError,
    IoResult, Result,
};
pub use hal::{BankedPort, DmaChannel, PortIo};
pub use host::{HaltEvent, IrPacket, NdisHost, NdisStatus, RxPacket, RxToken};

/// Shared engine constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on engine types and integration points.
pub mod constants {
    pub use crate::internal::constants::{
        // Frame sizes
        FAST_IR_FCS_SIZE,
        IR_ADDR_SIZE,
        IR_CONTROL_SIZE,
        MAX_DMA_FRAME_SIZE,
        MAX_EXTRA_SIR_BOFS,
        MAX_I_DATA_SIZE,
        MAX_IRDA_DATA_SIZE,
        MAX_NDIS_DATA_SIZE,
        MAX_RCV_DATA_SIZE,
        MEDIUM_IR_FCS_SIZE,
        MIN_SIR_FRAME_SIZE,
        SLOW_IR_FCS_SIZE,
        // Buffers
        NUM_RCV_BUFS,
        RCV_DMA_LOW_WATER,
        RCV_DMA_SIZE,
        SEND_QUEUE_DEPTH,
        // SIR wire format
        GOOD_FCS,
        INIT_FCS,
        SIR_BOF,
        SIR_EOF,
        SIR_ESC,
        SIR_ESC_COMPL,
        // Timing
        HALT_WAIT_TIMEOUT_MS,
    };
}
