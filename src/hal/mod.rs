//! Hardware Abstraction Layer
//!
//! This module provides the abstractions the engine drives the controller
//! through, keeping port and DMA access behind host-implemented traits.
//!
//! # Modules
//!
//! - [`port`]: Raw port I/O and the banked register file
//! - [`dma`]: Shared system DMA channel and its single-transfer bookkeeping
//!
//! # Delay Integration
//!
//! Busy-wait stalls use `embedded_hal::delay::DelayNs` directly. Pass any
//! delay implementation from your platform.

pub mod dma;
pub mod port;

// Re-export commonly used types
pub use dma::{DmaChannel, DmaDirection, DmaTransfer, DmaUtil};
pub use port::{BankedPort, PortIo};
