//! Centralized Constants
//!
//! This module provides a single source of truth for the magic numbers used
//! throughout the IrDA engine.
//!
//! # Organization
//!
//! Constants are grouped by category:
//! - **Frame/Buffer sizes**: IrLAP frame dimensions and buffer capacities
//! - **SIR wire format**: delimiter and escape bytes, FCS constants
//! - **Speeds**: tier boundaries and defaults
//! - **Polling bounds**: bounded busy-wait loops and their units
//! - **Timeouts**: halt and bring-up waits
//!
//! # Note
//!
//! Register offsets and bit definitions live in `internal::register`.

// =============================================================================
// Frame and Buffer Sizes
// =============================================================================

/// IrLAP address field size
pub const IR_ADDR_SIZE: usize = 1;

/// IrLAP control field size
pub const IR_CONTROL_SIZE: usize = 1;

/// Maximum I-field size negotiated by IrLAP
pub const MAX_I_DATA_SIZE: usize = 2048;

/// Maximum frame handed to/from the protocol (address + control + I-field)
pub const MAX_NDIS_DATA_SIZE: usize = IR_ADDR_SIZE + IR_CONTROL_SIZE + MAX_I_DATA_SIZE;

/// SIR frame check sequence size
pub const SLOW_IR_FCS_SIZE: usize = 2;

/// MIR frame check sequence size
pub const MEDIUM_IR_FCS_SIZE: usize = 2;

/// FIR frame check sequence size
pub const FAST_IR_FCS_SIZE: usize = 4;

/// Largest un-escaped SIR frame the receive framer accumulates (frame + FCS)
pub const MAX_RCV_DATA_SIZE: usize = MAX_NDIS_DATA_SIZE + SLOW_IR_FCS_SIZE;

/// Smallest SIR frame accepted at EOF (address + control + FCS)
pub const MIN_SIR_FRAME_SIZE: usize = IR_ADDR_SIZE + IR_CONTROL_SIZE + SLOW_IR_FCS_SIZE;

/// Upper bound on extra BOFs a packet may request
pub const MAX_EXTRA_SIR_BOFS: usize = 48;

/// Worst-case escaped SIR frame: extra BOFs, BOF, every byte escaped, EOF
pub const MAX_IRDA_DATA_SIZE: usize =
    MAX_EXTRA_SIR_BOFS + 1 + 2 * (MAX_NDIS_DATA_SIZE + SLOW_IR_FCS_SIZE) + 1;

/// Largest frame the FIR status FIFO may report (frame + FIR FCS)
pub const MAX_DMA_FRAME_SIZE: usize = MAX_NDIS_DATA_SIZE + FAST_IR_FCS_SIZE;

/// Number of receive buffer slots (and discrete SIR data buffers)
pub const NUM_RCV_BUFS: usize = 16;

/// FIR/MIR receive ring size: eight maximum frames plus one frame of margin
pub const RCV_DMA_SIZE: usize = 9 * MAX_DMA_FRAME_SIZE;

/// Receive windows smaller than this are logged as starved
pub const RCV_DMA_LOW_WATER: usize = 4 * MAX_DMA_FRAME_SIZE;

/// Send queue capacity
pub const SEND_QUEUE_DEPTH: usize = 32;

/// UART FIFO depth when the FIFO is present
pub const UART_FIFO_DEPTH: usize = 16;

/// Hardware status FIFO depth (frame-end entries)
pub const STATUS_FIFO_DEPTH: usize = 8;

// =============================================================================
// SIR Wire Format
// =============================================================================

/// Beginning of frame
pub const SIR_BOF: u8 = 0xC0;

/// End of frame
pub const SIR_EOF: u8 = 0xC1;

/// Control escape
pub const SIR_ESC: u8 = 0x7D;

/// XOR applied to an escaped byte
pub const SIR_ESC_COMPL: u8 = 0x20;

/// FCS register initial value
pub const INIT_FCS: u16 = 0xFFFF;

/// FCS residue of a frame whose appended FCS is intact
pub const GOOD_FCS: u16 = 0xF0B8;

// =============================================================================
// Speeds
// =============================================================================

/// Highest speed served by the software SIR framer
pub const MAX_SIR_SPEED: u32 = 115_200;

/// Link speed after initialize and reset
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// UART baud generator input divided by 16
pub const UART_CLOCK_BAUD: u32 = 115_200;

// =============================================================================
// Polling Bounds
// =============================================================================

/// LSR polls for THR empty before a SIR burst, in register reads
///
/// One interrupt latency covers a FIFO refill up to 115200 bps.
pub const SIR_TX_POLL_LIMIT: u32 = 100;

/// LSR polls for THR empty at 115200 bps, in register reads
///
/// Above 115200 bps the FIFO drains faster than interrupt latency.
pub const SIR_TX_POLL_LIMIT_FAST: u32 = 1000;

/// LSR polls for shift-register empty before a speed change, in register reads
pub const SIR_TX_SHIFT_EMPTY_POLLS: u32 = 10_000;

/// Interrupt identification passes handled per SIR interrupt
pub const SIR_ISR_MAX_PASSES: u32 = 32;

/// RX FIFO drains per SIR interrupt, in framer passes
pub const SIR_RX_MAX_PASSES: u32 = 8;

/// TXFLV polls after FIR transmit DMA completes, in register reads
pub const FIR_TX_FIFO_DRAIN_POLLS: u32 = 64;

/// LSR polls for TXRDY|TXEMP before starting FIR transmit DMA, in register reads
pub const FIR_TX_READY_POLLS: u32 = 16;

/// Bytes drained from the RX FIFO when the status FIFO runs ahead of DMA
pub const FIR_RX_DESYNC_DRAIN_LIMIT: u32 = 64;

/// Settle timer reload, in 125 µs hardware timer ticks
pub const FIR_RX_SETTLE_TICKS: u16 = 2;

/// Settle-timer re-arms before a stalled receive is torn down anyway
pub const FIR_RX_MAX_SETTLE_REARMS: u32 = 64;

/// Busy-wait before sampling dongle ID pins, in microseconds
pub const DONGLE_ID_SETTLE_US: u32 = 10;

// =============================================================================
// Timeouts
// =============================================================================

/// Halt waits this long for protocol returns and for the in-flight send
pub const HALT_WAIT_TIMEOUT_MS: u32 = 60_000;

/// Test interrupt wait, in 1 ms sleeps
pub const TEST_INTERRUPT_WAIT_MS: u32 = 500;

/// Full register verification attempts during initialize
pub const VERIFY_HARDWARE_ATTEMPTS: u32 = 5;

/// Settle after reprogramming the UART during verification
pub const VERIFY_HARDWARE_SETTLE_MS: u32 = 20;

// =============================================================================
// IrLAP Negotiation Defaults
// =============================================================================

/// Receive window reported to IrLAP
pub const MAX_RECEIVE_WINDOW_SIZE: u32 = 7;

/// Send window reported to IrLAP
pub const MAX_SEND_WINDOW_SIZE: u32 = 7;

/// Driver version reported through `OID_GEN_VENDOR_DRIVER_VERSION`
pub const VENDOR_DRIVER_VERSION: u32 = 0x0001_0000;

/// NDIS version implemented (`OID_GEN_DRIVER_VERSION`, major.minor)
pub const NDIS_DRIVER_VERSION: u16 = 0x0500;

/// IEEE-style vendor ID reported through `OID_GEN_VENDOR_ID`
pub const VENDOR_ID: u32 = 0x0008_0017;
