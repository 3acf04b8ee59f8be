//! SIR framing and packet conversion
//!
//! # Wire format
//!
//! ```text
//! SIR:      [extra BOF]* BOF | addr ctrl I-field FCS16 | EOF   (escaped body)
//! MIR/FIR:  addr ctrl I-field                                 (framed by hardware)
//! ```
//!
//! - [`fcs`]: CCITT-16 table and residue check
//! - [`sir_rx`]: receive state machine
//! - [`sir_tx`]: FIFO-burst transmitter
//! - [`convert`]: packet to frame conversion

pub mod convert;
pub mod fcs;
pub mod sir_rx;
pub mod sir_tx;

pub use convert::{
    build_sir_frame, escape_slow_ir_data, ndis_to_fir_packet, ndis_to_ir_packet,
    unescape_slow_ir_data,
};
pub use sir_rx::{FramerStats, RxState, SirReceiver};
pub use sir_tx::{SirTransmitter, TxStep};
