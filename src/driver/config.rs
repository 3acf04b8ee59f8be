//! Configuration types for the NSC IrDA adapter

use crate::dongle::DongleVendor;
use crate::error::{ConfigError, ConfigResult};

use super::speed::{
    NDIS_IRDA_SPEED_1152K, NDIS_IRDA_SPEED_115200, NDIS_IRDA_SPEED_19200, NDIS_IRDA_SPEED_2400,
    NDIS_IRDA_SPEED_38400, NDIS_IRDA_SPEED_4M, NDIS_IRDA_SPEED_57600, NDIS_IRDA_SPEED_576K,
    NDIS_IRDA_SPEED_9600, NDIS_IRDA_SPEED_ALL,
};

/// Controller chip variant (`BoardType` registry value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BoardType {
    /// PC87108 SuperI/O IrDA controller
    #[default]
    Pc87108 = 0,
    /// PC87308 SuperI/O
    Pc87308 = 1,
    /// PC87338 SuperI/O
    Pc87338 = 2,
    /// PUMA108 (chip-select mode, configuration registers follow the UART)
    Puma108 = 3,
}

impl BoardType {
    /// Decode a registry `BoardType` value
    pub const fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(BoardType::Pc87108),
            1 => Some(BoardType::Pc87308),
            2 => Some(BoardType::Pc87338),
            3 => Some(BoardType::Puma108),
            _ => None,
        }
    }

    /// Size of the I/O range the host must map for this board
    #[must_use]
    pub const fn io_window_len(self) -> usize {
        match self {
            BoardType::Puma108 => 16,
            _ => 8,
        }
    }
}

/// Complete adapter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdapterConfig {
    /// Chip variant
    pub board: BoardType,
    /// Configured transceiver on channels A and B
    pub dongle_types: [DongleVendor; 2],
    /// `MaxConnectRate` in bits per second; `None` when absent
    pub max_connect_rate: Option<u32>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterConfig {
    /// Create a configuration with defaults (PC87108, generic SIR dongles,
    /// no rate cap)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            board: BoardType::Pc87108,
            dongle_types: [DongleVendor::GenericSir, DongleVendor::GenericSir],
            max_connect_rate: None,
        }
    }

    /// Build from raw registry values
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBoardType`] or
    /// [`ConfigError::InvalidDongleType`] for out-of-table values.
    pub fn from_registry_values(
        board: u32,
        dongle_a: u32,
        dongle_b: u32,
        max_connect_rate: Option<u32>,
    ) -> ConfigResult<Self> {
        let board = BoardType::from_index(board).ok_or(ConfigError::InvalidBoardType)?;
        let a = DongleVendor::from_index(dongle_a).ok_or(ConfigError::InvalidDongleType)?;
        let b = DongleVendor::from_index(dongle_b).ok_or(ConfigError::InvalidDongleType)?;
        Ok(Self {
            board,
            dongle_types: [a, b],
            max_connect_rate,
        })
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the chip variant
    #[must_use]
    pub const fn with_board(mut self, board: BoardType) -> Self {
        self.board = board;
        self
    }

    /// Set the configured dongle types for channels A and B
    #[must_use]
    pub const fn with_dongle_types(mut self, a: DongleVendor, b: DongleVendor) -> Self {
        self.dongle_types = [a, b];
        self
    }

    /// Cap the negotiable speeds at `bits_per_sec`
    #[must_use]
    pub const fn with_max_connect_rate(mut self, bits_per_sec: u32) -> Self {
        self.max_connect_rate = Some(bits_per_sec);
        self
    }

    /// NDIS speed mask permitted by `MaxConnectRate`
    ///
    /// Each cap includes every slower rate; 2400 bps is always allowed.
    /// An absent or unrecognized cap permits every speed.
    #[must_use]
    pub const fn allowed_speed_mask(&self) -> u32 {
        let Some(rate) = self.max_connect_rate else {
            return NDIS_IRDA_SPEED_ALL;
        };
        const SIR_9600: u32 = NDIS_IRDA_SPEED_9600 | NDIS_IRDA_SPEED_2400;
        const SIR_19200: u32 = SIR_9600 | NDIS_IRDA_SPEED_19200;
        const SIR_38400: u32 = SIR_19200 | NDIS_IRDA_SPEED_38400;
        const SIR_57600: u32 = SIR_38400 | NDIS_IRDA_SPEED_57600;
        const SIR_115200: u32 = SIR_57600 | NDIS_IRDA_SPEED_115200;
        const MIR_576: u32 = SIR_115200 | NDIS_IRDA_SPEED_576K;
        const MIR_1152: u32 = MIR_576 | NDIS_IRDA_SPEED_1152K;
        const FIR_4M: u32 = MIR_1152 | NDIS_IRDA_SPEED_4M;
        match rate {
            2_400 => NDIS_IRDA_SPEED_2400,
            9_600 => SIR_9600,
            19_200 => SIR_19200,
            38_400 => SIR_38400,
            57_600 => SIR_57600,
            115_200 => SIR_115200,
            576_000 => MIR_576,
            1_152_000 => MIR_1152,
            4_000_000 => FIR_4M,
            _ => NDIS_IRDA_SPEED_ALL,
        }
    }
}

/// Hardware status reported through `OID_GEN_HARDWARE_STATUS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum HardwareStatus {
    /// Running
    Ready = 0,
    /// Initialize in progress
    #[default]
    Initializing = 1,
    /// Reset in progress
    Reset = 2,
    /// Halt in progress
    Closing = 3,
    /// Not usable
    NotReady = 4,
}

// =============================================================================
// Unit Tests
// =============================================================================
