//! Generic Transceiver Trait
//!
//! Common description of an IrDA transceiver ("dongle"): which physical modes
//! it supports, what the link layer must honour when talking through it, and
//! the pin sequence that switches it between modes.

use crate::driver::speed::{
    NDIS_IRDA_SPEED_576K, NDIS_IRDA_SPEED_1152K, NDIS_IRDA_SPEED_4M, NDIS_IRDA_SPEED_SIR_ALL,
};

// =============================================================================
// Physical Modes
// =============================================================================

/// Transceiver physical mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrMode {
    /// Serial IR, 2400 - 115200 bps
    Sir,
    /// Medium IR, 576 kbps
    Mir576,
    /// Medium IR, 1.152 Mbps
    Mir1152,
    /// Fast IR, 4 Mbps
    Fir4M,
    /// Transceiver shut down
    LowPower,
}

impl IrMode {
    /// Bit for this mode in an [`IrModes`] set
    pub const fn bit(self) -> u16 {
        match self {
            IrMode::Sir => IrModes::SIR.0,
            IrMode::Mir576 => IrModes::MIR_576.0,
            IrMode::Mir1152 => IrModes::MIR_1152.0,
            IrMode::Fir4M => IrModes::FIR_4M.0,
            IrMode::LowPower => IrModes::LOW_POWER.0,
        }
    }
}

/// Set of supported [`IrMode`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrModes(u16);

impl IrModes {
    /// No modes
    pub const NONE: Self = Self(0);
    /// Serial IR
    pub const SIR: Self = Self(0x01);
    /// 576 kbps MIR
    pub const MIR_576: Self = Self(0x02);
    /// 1.152 Mbps MIR
    pub const MIR_1152: Self = Self(0x04);
    /// 4 Mbps FIR
    pub const FIR_4M: Self = Self(0x08);
    /// Software shutdown
    pub const LOW_POWER: Self = Self(0x10);

    /// Union of two sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check if `mode` is in the set
    pub const fn contains(self, mode: IrMode) -> bool {
        self.0 & mode.bit() != 0
    }

    /// Raw bits
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// NDIS IrDA speed mask reachable through these modes
    pub const fn ndis_speed_mask(self) -> u32 {
        let mut mask = 0;
        if self.contains(IrMode::Sir) {
            mask |= NDIS_IRDA_SPEED_SIR_ALL;
        }
        if self.contains(IrMode::Mir576) {
            mask |= NDIS_IRDA_SPEED_576K;
        }
        if self.contains(IrMode::Mir1152) {
            mask |= NDIS_IRDA_SPEED_1152K;
        }
        if self.contains(IrMode::Fir4M) {
            mask |= NDIS_IRDA_SPEED_4M;
        }
        mask
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Transceiver capability record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DongleCaps {
    /// Supported physical modes
    pub modes: IrModes,
    /// Minimum turnaround time the transceiver needs, in microseconds
    pub turnaround_usec: u32,
    /// Extra BOFs the transceiver needs at SIR speeds
    pub extra_bofs: u32,
}

impl DongleCaps {
    /// SIR-only transceiver with the IrDA default turnaround
    pub const fn sir_only() -> Self {
        Self {
            modes: IrModes::SIR,
            turnaround_usec: 10_000,
            extra_bofs: 0,
        }
    }
}

/// One step of a mode-switch sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioStep {
    /// Level of the IRSL0..IRSL2 pins
    pub pins: u8,
    /// Busy-wait after driving the pins, in microseconds
    pub settle_us: u32,
}

impl GpioStep {
    /// Shorthand constructor for sequence tables
    pub const fn new(pins: u8, settle_us: u32) -> Self {
        Self { pins, settle_us }
    }
}

// =============================================================================
// Transceiver Trait
// =============================================================================

/// Trait for IrDA transceiver parts
///
/// Implementations are stateless descriptions; the current mode lives in the
/// channel's [`DongleParam`](super::DongleParam).
///
/// # Example Implementation
///
/// ```ignore
/// struct MyPart;
///
/// impl Transceiver for MyPart {
///     fn name(&self) -> &'static str { "my part" }
///     fn capabilities(&self) -> DongleCaps { DongleCaps::sir_only() }
///     fn mode_sequence(&self, mode: IrMode) -> Option<&'static [GpioStep]> {
///         match mode {
///             IrMode::Sir => Some(&[]),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Transceiver {
    /// Part name for logs
    fn name(&self) -> &'static str;

    /// Capability record of the part
    fn capabilities(&self) -> DongleCaps;

    /// Pin sequence entering `mode`, `None` if the part cannot do it
    fn mode_sequence(&self, mode: IrMode) -> Option<&'static [GpioStep]>;
}
