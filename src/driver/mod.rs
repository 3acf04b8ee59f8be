//! Core engine for the NSC IrDA controllers.
//!
//! This module contains the adapter and the pieces it is built from:
//!
//! - [`config`] - Board and dongle configuration, builder pattern
//! - [`speed`] - Link speed table and NDIS speed masks
//! - [`rx_pool`] - Receive slot pool and free-space search over the DMA ring
//! - [`oid`] - Query/set information identifiers and errors
//! - [`NscIrda`] - The adapter itself (bring-up, send, receive, interrupts)
//!
//! # Example
//!
//! ```ignore
//! use nsc_irda::driver::{AdapterConfig, BoardType};
//! use nsc_irda::dongle::DongleVendor;
//!
//! let config = AdapterConfig::new()
//!     .with_board(BoardType::Pc87338)
//!     .with_dongle_types(DongleVendor::Hp, DongleVendor::GenericSir);
//! ```

// Submodules
mod adapter;
mod arena;
pub mod config;
mod delivery;
mod fir;
mod interrupt;
pub mod oid;
pub mod rx_pool;
mod send;
mod sir;
pub mod speed;
mod state;

// Re-exports for convenience
pub use adapter::{NscIrda, ResetStatus};
pub use config::{AdapterConfig, BoardType, HardwareStatus};
pub use interrupt::{FirEvents, IsrOutcome, SirCause};
pub use oid::OidError;
pub use speed::{BaudRate, BaudRateInfo, BAUD_RATE_TABLE};
pub use state::RegStats;
