//! Link speed table
//!
//! Static mapping from symbolic rates to bits per second and to the NDIS
//! IrDA speed bitmask reported through `OID_IRDA_SUPPORTED_SPEEDS`.

use crate::dongle::IrMode;
use crate::internal::constants::{
    FAST_IR_FCS_SIZE, MAX_SIR_SPEED, MEDIUM_IR_FCS_SIZE, SLOW_IR_FCS_SIZE, UART_CLOCK_BAUD,
};
use crate::internal::register::mcr;

/// 2400 bps
pub const NDIS_IRDA_SPEED_2400: u32 = 0x001;
/// 9600 bps
pub const NDIS_IRDA_SPEED_9600: u32 = 0x002;
/// 19200 bps
pub const NDIS_IRDA_SPEED_19200: u32 = 0x004;
/// 38400 bps
pub const NDIS_IRDA_SPEED_38400: u32 = 0x008;
/// 57600 bps
pub const NDIS_IRDA_SPEED_57600: u32 = 0x010;
/// 115200 bps
pub const NDIS_IRDA_SPEED_115200: u32 = 0x020;
/// 576 kbps
pub const NDIS_IRDA_SPEED_576K: u32 = 0x040;
/// 1.152 Mbps
pub const NDIS_IRDA_SPEED_1152K: u32 = 0x080;
/// 4 Mbps
pub const NDIS_IRDA_SPEED_4M: u32 = 0x100;

/// Every SIR rate
pub const NDIS_IRDA_SPEED_SIR_ALL: u32 = NDIS_IRDA_SPEED_2400
    | NDIS_IRDA_SPEED_9600
    | NDIS_IRDA_SPEED_19200
    | NDIS_IRDA_SPEED_38400
    | NDIS_IRDA_SPEED_57600
    | NDIS_IRDA_SPEED_115200;

/// Every rate the engine can run
pub const NDIS_IRDA_SPEED_ALL: u32 =
    NDIS_IRDA_SPEED_SIR_ALL | NDIS_IRDA_SPEED_576K | NDIS_IRDA_SPEED_1152K | NDIS_IRDA_SPEED_4M;

/// Symbolic link rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BaudRate {
    /// 2400 bps SIR
    B2400,
    /// 9600 bps SIR
    B9600,
    /// 19200 bps SIR
    B19200,
    /// 38400 bps SIR
    B38400,
    /// 57600 bps SIR
    B57600,
    /// 115200 bps SIR
    B115200,
    /// 576 kbps MIR
    B576K,
    /// 1.152 Mbps MIR
    B1152K,
    /// 4 Mbps FIR
    B4M,
}

/// One row of the speed table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaudRateInfo {
    /// Symbolic rate
    pub rate: BaudRate,
    /// Bits per second
    pub bits_per_sec: u32,
    /// NDIS speed bit
    pub ndis_code: u32,
}

/// Speed table, indexed by `BaudRate as usize`
pub const BAUD_RATE_TABLE: [BaudRateInfo; 9] = [
    BaudRateInfo { rate: BaudRate::B2400, bits_per_sec: 2_400, ndis_code: NDIS_IRDA_SPEED_2400 },
    BaudRateInfo { rate: BaudRate::B9600, bits_per_sec: 9_600, ndis_code: NDIS_IRDA_SPEED_9600 },
    BaudRateInfo { rate: BaudRate::B19200, bits_per_sec: 19_200, ndis_code: NDIS_IRDA_SPEED_19200 },
    BaudRateInfo { rate: BaudRate::B38400, bits_per_sec: 38_400, ndis_code: NDIS_IRDA_SPEED_38400 },
    BaudRateInfo { rate: BaudRate::B57600, bits_per_sec: 57_600, ndis_code: NDIS_IRDA_SPEED_57600 },
    BaudRateInfo { rate: BaudRate::B115200, bits_per_sec: 115_200, ndis_code: NDIS_IRDA_SPEED_115200 },
    BaudRateInfo { rate: BaudRate::B576K, bits_per_sec: 576_000, ndis_code: NDIS_IRDA_SPEED_576K },
    BaudRateInfo { rate: BaudRate::B1152K, bits_per_sec: 1_152_000, ndis_code: NDIS_IRDA_SPEED_1152K },
    BaudRateInfo { rate: BaudRate::B4M, bits_per_sec: 4_000_000, ndis_code: NDIS_IRDA_SPEED_4M },
];

impl BaudRate {
    /// All rates, slowest first
    pub const ALL: [BaudRate; 9] = [
        BaudRate::B2400,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
        BaudRate::B576K,
        BaudRate::B1152K,
        BaudRate::B4M,
    ];

    /// Table row for this rate
    pub const fn info(self) -> &'static BaudRateInfo {
        &BAUD_RATE_TABLE[self as usize]
    }

    /// Bits per second
    pub const fn bits_per_sec(self) -> u32 {
        self.info().bits_per_sec
    }

    /// NDIS speed bit
    pub const fn ndis_code(self) -> u32 {
        self.info().ndis_code
    }

    /// Look up an exact bits-per-second value
    pub fn from_bps(bits_per_sec: u32) -> Option<Self> {
        BAUD_RATE_TABLE
            .iter()
            .find(|row| row.bits_per_sec == bits_per_sec)
            .map(|row| row.rate)
    }

    /// Check if the rate is served by the software framer
    pub const fn is_sir(self) -> bool {
        self.bits_per_sec() <= MAX_SIR_SPEED
    }

    /// Transceiver mode needed for this rate
    pub const fn ir_mode(self) -> IrMode {
        match self {
            BaudRate::B576K => IrMode::Mir576,
            BaudRate::B1152K => IrMode::Mir1152,
            BaudRate::B4M => IrMode::Fir4M,
            _ => IrMode::Sir,
        }
    }

    /// UART baud generator divisor (SIR rates only)
    pub const fn uart_divisor(self) -> Option<u16> {
        if self.is_sir() {
            Some((UART_CLOCK_BAUD / self.bits_per_sec()) as u16)
        } else {
            None
        }
    }

    /// FCS trailer length on the wire
    pub const fn fcs_size(self) -> usize {
        match self {
            BaudRate::B576K | BaudRate::B1152K => MEDIUM_IR_FCS_SIZE,
            BaudRate::B4M => FAST_IR_FCS_SIZE,
            _ => SLOW_IR_FCS_SIZE,
        }
    }

    /// MCR operating mode bits
    pub const fn mcr_mode(self) -> u8 {
        match self {
            BaudRate::B576K | BaudRate::B1152K => mcr::MODE_MIR,
            BaudRate::B4M => mcr::MODE_FIR,
            _ => mcr::MODE_SIR,
        }
    }
}

impl core::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} bps", self.bits_per_sec())
    }
}
