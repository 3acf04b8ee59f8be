//! IrDA Transceiver (Dongle) Layer
//!
//! The controller has two transceiver interfaces (A and B). Each one carries
//! an ID sense input pin set and three mode select outputs (IRSL0..IRSL2), all
//! in the bank 7 IRCFG registers. Channel A is the active transceiver; channel
//! B is probed and reported but never switched.
//!
//! # Usage
//!
//! ```ignore
//! use nsc_irda::dongle::{DongleChannel, DongleVendor, Dongles, IrMode};
//!
//! let mut dongles = Dongles::new([DongleVendor::Hp, DongleVendor::GenericSir]);
//! let caps = dongles.get_capabilities(&port, DongleChannel::A, &mut delay)?;
//! if caps.modes.contains(IrMode::Fir4M) {
//!     dongles.set_req_mode(&port, DongleChannel::A, IrMode::Fir4M, &mut delay)?;
//! }
//! ```

pub mod generic;
pub mod vendors;

pub use generic::{DongleCaps, GpioStep, IrMode, IrModes, Transceiver};
pub use vendors::{DellTitan, GenericSir, HpHsdl1100, Ibm31t1100, SharpRy5hd01, TemicTfds6000};

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::error::{DongleError, DongleResult};
use crate::hal::{BankedPort, PortIo};
use crate::internal::constants::DONGLE_ID_SETTLE_US;
use crate::internal::register::{bank7, ircfg};

// =============================================================================
// Vendors
// =============================================================================

/// Supported transceiver parts, in registry index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DongleVendor {
    /// Generic SIR-only part
    #[default]
    GenericSir,
    /// HP HSDL-1100
    Hp,
    /// Temic TFDS6000
    Temic,
    /// Sharp RY5HD01
    Sharp,
    /// Dell Titan
    Dell,
    /// IBM 31T1100
    Ibm,
}

/// Dongle types accepted in the `DongleA_Type`/`DongleB_Type` registry values
pub const VALID_DONGLE_TYPES: [DongleVendor; 6] = [
    DongleVendor::GenericSir,
    DongleVendor::Hp,
    DongleVendor::Temic,
    DongleVendor::Sharp,
    DongleVendor::Dell,
    DongleVendor::Ibm,
];

impl DongleVendor {
    /// Look up a registry dongle type index
    pub fn from_index(index: u32) -> Option<Self> {
        VALID_DONGLE_TYPES.get(index as usize).copied()
    }

    /// Part description for this vendor
    pub fn transceiver(self) -> &'static dyn Transceiver {
        match self {
            DongleVendor::GenericSir => &GenericSir,
            DongleVendor::Hp => &HpHsdl1100,
            DongleVendor::Temic => &TemicTfds6000,
            DongleVendor::Sharp => &SharpRy5hd01,
            DongleVendor::Dell => &DellTitan,
            DongleVendor::Ibm => &Ibm31t1100,
        }
    }
}

// =============================================================================
// Signatures
// =============================================================================

/// ID pins floating: nothing attached
pub const SIGNATURE_ABSENT: u8 = 0x1F;
/// Legacy part that does not identify itself
pub const SIGNATURE_LEGACY: u8 = 0x0F;

/// What a signature read says about the attached part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signature {
    /// No transceiver
    Absent,
    /// Part present but silent; trust the configured type
    Legacy,
    /// Self-identified part
    Vendor(DongleVendor),
    /// Unrecognized ID
    Unknown(u8),
}

impl Signature {
    /// Decode the 5 ID sense bits
    pub fn decode(id: u8) -> Self {
        match id & ircfg::ID_MASK {
            SIGNATURE_ABSENT => Signature::Absent,
            SIGNATURE_LEGACY => Signature::Legacy,
            0x00 => Signature::Vendor(DongleVendor::Ibm),
            0x04 => Signature::Vendor(DongleVendor::Hp),
            0x06 => Signature::Vendor(DongleVendor::Temic),
            0x09 => Signature::Vendor(DongleVendor::Sharp),
            0x0A => Signature::Vendor(DongleVendor::Dell),
            other => Signature::Unknown(other),
        }
    }
}

// =============================================================================
// Channels
// =============================================================================

/// Transceiver interface on the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DongleChannel {
    /// Interface A (active)
    A,
    /// Interface B
    B,
}

impl DongleChannel {
    const fn index(self) -> usize {
        match self {
            DongleChannel::A => 0,
            DongleChannel::B => 1,
        }
    }

    const fn ircfg_reg(self) -> u8 {
        match self {
            DongleChannel::A => bank7::IRCFG1,
            DongleChannel::B => bank7::IRCFG2,
        }
    }
}

/// Per-channel transceiver record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DongleParam {
    /// Set once the part has been identified and its caps recorded
    pub valid: bool,
    /// Identified part
    pub vendor: Option<DongleVendor>,
    /// Raw ID read at probe time
    pub signature: u8,
    /// Recorded capabilities
    pub caps: DongleCaps,
    /// Mode last entered through [`Dongles::set_req_mode`]
    pub current_mode: Option<IrMode>,
}

/// Both transceiver channels plus their configured types
#[derive(Debug, Clone)]
pub struct Dongles {
    params: [DongleParam; 2],
    configured: [DongleVendor; 2],
}

impl Dongles {
    /// Create with the configured (registry) types for A and B
    pub fn new(configured: [DongleVendor; 2]) -> Self {
        Self {
            params: [DongleParam::default(); 2],
            configured,
        }
    }

    /// Record for `channel`
    pub fn param(&self, channel: DongleChannel) -> &DongleParam {
        &self.params[channel.index()]
    }

    /// Forget probe results so the next query re-identifies the parts
    pub fn invalidate(&mut self) {
        self.params = [DongleParam::default(); 2];
    }

    /// Identify the part on `channel` and return its capabilities
    ///
    /// Results are cached in the channel's [`DongleParam`]; only the first call
    /// after [`invalidate`](Self::invalidate) touches the hardware.
    pub fn get_capabilities<B, D>(
        &mut self,
        port: &BankedPort<B>,
        channel: DongleChannel,
        delay: &mut D,
    ) -> DongleResult<DongleCaps>
    where
        B: PortIo,
        D: DelayNs,
    {
        let param = &mut self.params[channel.index()];
        if param.valid {
            return Ok(param.caps);
        }

        let signature = read_signature(port, channel, delay);
        param.signature = signature;
        let vendor = match Signature::decode(signature) {
            Signature::Vendor(vendor) => vendor,
            Signature::Legacy => self.configured[channel.index()],
            Signature::Absent => {
                debug!("dongle {channel:?}: nothing attached");
                return Err(DongleError::GetCapab);
            }
            Signature::Unknown(id) => {
                warn!("dongle {channel:?}: unknown signature {id:#04x}");
                return Err(DongleError::GetCapab);
            }
        };

        let part = vendor.transceiver();
        param.vendor = Some(vendor);
        param.caps = part.capabilities();
        param.valid = true;
        info!(
            "dongle {channel:?}: {} (id {signature:#04x}), speeds {:#05x}",
            part.name(),
            param.caps.modes.ndis_speed_mask()
        );
        Ok(param.caps)
    }

    /// Drive the part on `channel` into `mode`
    ///
    /// The channel must have been identified first.
    pub fn set_req_mode<B, D>(
        &mut self,
        port: &BankedPort<B>,
        channel: DongleChannel,
        mode: IrMode,
        delay: &mut D,
    ) -> DongleResult<()>
    where
        B: PortIo,
        D: DelayNs,
    {
        let param = &mut self.params[channel.index()];
        let vendor = match (param.valid, param.vendor) {
            (true, Some(vendor)) => vendor,
            _ => return Err(DongleError::GetCapab),
        };
        if !param.caps.modes.contains(mode) {
            return Err(DongleError::Unsupported);
        }
        let steps = vendor
            .transceiver()
            .mode_sequence(mode)
            .ok_or(DongleError::Unsupported)?;

        let reg = channel.ircfg_reg();
        for step in steps {
            port.sync_modify_bank_reg(7, reg, |v| {
                (v & !ircfg::IRSL_MASK) | (step.pins & ircfg::IRSL_MASK)
            });
            if step.settle_us > 0 {
                delay.delay_us(step.settle_us);
            }
        }
        param.current_mode = Some(mode);
        debug!("dongle {channel:?}: mode {mode:?}");
        Ok(())
    }

    /// Identify the part if needed, then switch it to `mode`
    pub fn set_capabilities<B, D>(
        &mut self,
        port: &BankedPort<B>,
        channel: DongleChannel,
        mode: IrMode,
        delay: &mut D,
    ) -> DongleResult<()>
    where
        B: PortIo,
        D: DelayNs,
    {
        self.get_capabilities(port, channel, delay)?;
        self.set_req_mode(port, channel, mode, delay)
    }
}

/// Read the 5-bit ID of the part on `channel`
///
/// ID sense is raised, the pins are given [`DONGLE_ID_SETTLE_US`] to settle,
/// and the register is restored afterwards.
pub fn read_signature<B, D>(port: &BankedPort<B>, channel: DongleChannel, delay: &mut D) -> u8
where
    B: PortIo,
    D: DelayNs,
{
    let reg = channel.ircfg_reg();
    let saved = port.sync_read_bank_reg(7, reg);
    port.sync_write_bank_reg(7, reg, saved | ircfg::ID_SENSE);
    delay.delay_us(DONGLE_ID_SETTLE_US);
    let id = port.sync_read_bank_reg(7, reg) & ircfg::ID_MASK;
    port.sync_write_bank_reg(7, reg, saved & !ircfg::ID_SENSE);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockDelay, MockPort};

    fn setup(sig_a: u8) -> (BankedPort<MockPort>, MockDelay) {
        let port = BankedPort::new(MockPort::new());
        port.io().set_dongle_signature(0, sig_a);
        (port, MockDelay::new())
    }

    #[test]
    fn signature_table() {
        assert_eq!(Signature::decode(0x1F), Signature::Absent);
        assert_eq!(Signature::decode(0x0F), Signature::Legacy);
        assert_eq!(Signature::decode(0x04), Signature::Vendor(DongleVendor::Hp));
        assert_eq!(Signature::decode(0x0A), Signature::Vendor(DongleVendor::Dell));
        assert_eq!(Signature::decode(0x13), Signature::Unknown(0x13));
        // upper bits are not part of the ID
        assert_eq!(Signature::decode(0xE4), Signature::Vendor(DongleVendor::Hp));
    }

    #[test]
    fn vendor_from_registry_index() {
        assert_eq!(DongleVendor::from_index(0), Some(DongleVendor::GenericSir));
        assert_eq!(DongleVendor::from_index(5), Some(DongleVendor::Ibm));
        assert_eq!(DongleVendor::from_index(6), None);
    }

    #[test]
    fn identified_part_reports_its_caps() {
        let (port, mut delay) = setup(0x04);
        let mut dongles = Dongles::new([DongleVendor::GenericSir; 2]);

        let caps = dongles
            .get_capabilities(&port, DongleChannel::A, &mut delay)
            .unwrap();

        assert!(caps.modes.contains(IrMode::Fir4M));
        let param = dongles.param(DongleChannel::A);
        assert!(param.valid);
        assert_eq!(param.vendor, Some(DongleVendor::Hp));
        assert_eq!(param.signature, 0x04);
        assert!(delay.total_ns() >= u64::from(DONGLE_ID_SETTLE_US) * 1_000);
        // ID sense released
        assert_eq!(port.io().bank_reg(7, bank7::IRCFG1) & ircfg::ID_SENSE, 0);
    }

    #[test]
    fn legacy_signature_uses_configured_type() {
        let (port, mut delay) = setup(SIGNATURE_LEGACY);
        let mut dongles = Dongles::new([DongleVendor::Sharp, DongleVendor::GenericSir]);

        let caps = dongles
            .get_capabilities(&port, DongleChannel::A, &mut delay)
            .unwrap();

        assert_eq!(caps, SharpRy5hd01.capabilities());
    }

    #[test]
    fn absent_or_unknown_part_fails() {
        let (port, mut delay) = setup(SIGNATURE_ABSENT);
        let mut dongles = Dongles::new([DongleVendor::Hp; 2]);
        assert_eq!(
            dongles.get_capabilities(&port, DongleChannel::A, &mut delay),
            Err(DongleError::GetCapab)
        );

        port.io().set_dongle_signature(0, 0x13);
        assert_eq!(
            dongles.get_capabilities(&port, DongleChannel::A, &mut delay),
            Err(DongleError::GetCapab)
        );
        assert!(!dongles.param(DongleChannel::A).valid);
    }

    #[test]
    fn caps_are_cached_once_valid() {
        let (port, mut delay) = setup(0x04);
        let mut dongles = Dongles::new([DongleVendor::GenericSir; 2]);
        dongles
            .get_capabilities(&port, DongleChannel::A, &mut delay)
            .unwrap();

        // a later signature change is ignored until invalidated
        port.io().set_dongle_signature(0, SIGNATURE_ABSENT);
        assert!(dongles
            .get_capabilities(&port, DongleChannel::A, &mut delay)
            .is_ok());

        dongles.invalidate();
        assert!(dongles
            .get_capabilities(&port, DongleChannel::A, &mut delay)
            .is_err());
    }

    #[test]
    fn set_req_mode_requires_probe() {
        let (port, mut delay) = setup(0x04);
        let mut dongles = Dongles::new([DongleVendor::GenericSir; 2]);
        assert_eq!(
            dongles.set_req_mode(&port, DongleChannel::A, IrMode::Sir, &mut delay),
            Err(DongleError::GetCapab)
        );
    }

    #[test]
    fn set_capabilities_drives_mode_pins() {
        let (port, mut delay) = setup(0x04);
        let mut dongles = Dongles::new([DongleVendor::GenericSir; 2]);

        dongles
            .set_capabilities(&port, DongleChannel::A, IrMode::Fir4M, &mut delay)
            .unwrap();

        assert_eq!(port.io().bank_reg(7, bank7::IRCFG1) & ircfg::IRSL_MASK, 0b001);
        assert_eq!(
            dongles.param(DongleChannel::A).current_mode,
            Some(IrMode::Fir4M)
        );

        dongles
            .set_req_mode(&port, DongleChannel::A, IrMode::Sir, &mut delay)
            .unwrap();
        assert_eq!(port.io().bank_reg(7, bank7::IRCFG1) & ircfg::IRSL_MASK, 0);
        assert!(port.bank0_selected());
    }

    #[test]
    fn unsupported_mode_is_refused() {
        let (port, mut delay) = setup(SIGNATURE_LEGACY);
        let mut dongles = Dongles::new([DongleVendor::GenericSir; 2]);

        assert_eq!(
            dongles.set_capabilities(&port, DongleChannel::A, IrMode::Fir4M, &mut delay),
            Err(DongleError::Unsupported)
        );
        assert_eq!(dongles.param(DongleChannel::A).current_mode, None);
    }

    #[test]
    fn channel_b_uses_second_config_register() {
        let port = BankedPort::new(MockPort::new());
        port.io().set_dongle_signature(1, 0x06);
        let mut delay = MockDelay::new();
        let mut dongles = Dongles::new([DongleVendor::GenericSir; 2]);

        dongles
            .get_capabilities(&port, DongleChannel::B, &mut delay)
            .unwrap();

        assert_eq!(
            dongles.param(DongleChannel::B).vendor,
            Some(DongleVendor::Temic)
        );
        assert!(!dongles.param(DongleChannel::A).valid);
    }
}
