//! Error types for the NSC IrDA engine
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Initialization and configuration failures
//! - [`DmaError`]: Shared DMA channel and receive-window issues
//! - [`IoError`]: Runtime TX/RX failures
//! - [`DongleError`]: Transceiver identification and mode switching
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most driver methods. Outcomes visible to the protocol stack are
//! reported separately as [`NdisStatus`](crate::host::NdisStatus).

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and initialization errors
///
/// These are fatal to bringing the adapter up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Adapter already initialized
    AlreadyInitialized,
    /// Invalid configuration parameter
    InvalidConfig,
    /// `BoardType` value outside the supported chip list
    InvalidBoardType,
    /// `Dongle_A_Type`/`Dongle_B_Type` outside the valid dongle table
    InvalidDongleType,
    /// Register probe did not find an NSC controller at the port base
    HardwareNotFound,
    /// The interrupt line never delivered the test interrupt
    InterruptTestFailed,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::AlreadyInitialized => "already initialized",
            ConfigError::InvalidConfig => "invalid configuration",
            ConfigError::InvalidBoardType => "invalid board type",
            ConfigError::InvalidDongleType => "invalid dongle type",
            ConfigError::HardwareNotFound => "hardware verification failed",
            ConfigError::InterruptTestFailed => "interrupt line test failed",
        }
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// Shared DMA channel errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// A transfer is already active on the channel
    ChannelBusy,
    /// Completion requested with no active transfer
    NotActive,
    /// Completion direction differs from the active transfer
    DirectionMismatch,
    /// The host DMA adapter refused to program the transfer
    SetupFailed,
    /// Frame too large for the conversion buffer
    FrameTooLarge,
    /// Invalid transfer length (zero or outside the buffer)
    InvalidLength,
    /// No free span left in the receive ring
    NoSpace,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DmaError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaError::ChannelBusy => "DMA channel busy",
            DmaError::NotActive => "no active DMA transfer",
            DmaError::DirectionMismatch => "DMA direction mismatch",
            DmaError::SetupFailed => "DMA setup failed",
            DmaError::FrameTooLarge => "frame too large for buffers",
            DmaError::InvalidLength => "invalid transfer length",
            DmaError::NoSpace => "no free receive ring space",
        }
    }
}

// =============================================================================
// I/O Errors
// =============================================================================

/// Runtime TX/RX errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// Invalid state for operation (e.g., not initialized)
    InvalidState,
    /// The adapter is halting
    Halting,
    /// Send queue has no room for another packet
    QueueFull,
    /// Transmit FIFO ran dry during a FIR/MIR frame
    TransmitUnderrun,
    /// A returned receive token was not pending with the protocol
    NotPending,
    /// Buffer too small for the frame
    BufferTooSmall,
    /// Malformed SIR escape sequence
    InvalidFrame,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IoError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IoError::InvalidState => "invalid state for operation",
            IoError::Halting => "adapter halting",
            IoError::QueueFull => "send queue full",
            IoError::TransmitUnderrun => "transmit underrun",
            IoError::NotPending => "receive buffer not pending",
            IoError::BufferTooSmall => "buffer too small for frame",
            IoError::InvalidFrame => "malformed SIR frame",
        }
    }
}

// =============================================================================
// Dongle Errors
// =============================================================================

/// Transceiver (dongle) errors
///
/// Neither is fatal: a failed speed change leaves the link at its
/// previous speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DongleError {
    /// Signature unknown or nothing attached to the channel
    GetCapab,
    /// The identified part does not support the requested mode
    Unsupported,
}

impl core::fmt::Display for DongleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DongleError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DongleError::GetCapab => "dongle capabilities unavailable",
            DongleError::Unsupported => "mode unsupported by dongle",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// ```ignore
/// match adapter.initialize() {
///     Err(Error::Config(ConfigError::InterruptTestFailed)) => { /* ... */ }
///     Err(Error::Dongle(DongleError::GetCapab)) => { /* ... */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// DMA error
    Dma(DmaError),
    /// I/O error
    Io(IoError),
    /// Dongle error
    Dongle(DongleError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {}", e.as_str()),
            Error::Io(e) => write!(f, "io: {}", e.as_str()),
            Error::Dongle(e) => write!(f, "dongle: {}", e.as_str()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DmaError> for Error {
    fn from(e: DmaError) -> Self {
        Error::Dma(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

impl From<DongleError> for Error {
    fn from(e: DongleError) -> Self {
        Error::Dongle(e)
    }
}

/// Result type alias for adapter operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for DMA operations
pub type DmaResult<T> = core::result::Result<T, DmaError>;

/// Result type alias for I/O operations
pub type IoResult<T> = core::result::Result<T, IoError>;

/// Result type alias for dongle operations
pub type DongleResult<T> = core::result::Result<T, DongleError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn config_error_as_str_non_empty() {
        let variants = [
            ConfigError::AlreadyInitialized,
            ConfigError::InvalidConfig,
            ConfigError::InvalidBoardType,
            ConfigError::InvalidDongleType,
            ConfigError::HardwareNotFound,
            ConfigError::InterruptTestFailed,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "ConfigError::{variant:?} has empty string");
        }
    }

    #[test]
    fn config_error_display() {
        let display = format!("{}", ConfigError::InterruptTestFailed);
        assert_eq!(display, "interrupt line test failed");
    }

    #[test]
    fn dma_error_as_str_non_empty() {
        let variants = [
            DmaError::ChannelBusy,
            DmaError::NotActive,
            DmaError::DirectionMismatch,
            DmaError::SetupFailed,
            DmaError::FrameTooLarge,
            DmaError::InvalidLength,
            DmaError::NoSpace,
        ];

        for variant in variants {
            assert!(!variant.as_str().is_empty(), "DmaError::{variant:?} has empty string");
        }
    }

    #[test]
    fn dma_error_display() {
        assert_eq!(format!("{}", DmaError::ChannelBusy), "DMA channel busy");
    }

    #[test]
    fn io_error_equality() {
        assert_eq!(IoError::Halting, IoError::Halting);
        assert_ne!(IoError::Halting, IoError::QueueFull);
    }

    #[test]
    fn dongle_error_display() {
        assert_eq!(format!("{}", DongleError::Unsupported), "mode unsupported by dongle");
    }

    #[test]
    fn error_from_domain_errors() {
        assert_eq!(Error::from(ConfigError::InvalidConfig), Error::Config(ConfigError::InvalidConfig));
        assert_eq!(Error::from(DmaError::NoSpace), Error::Dma(DmaError::NoSpace));
        assert_eq!(Error::from(IoError::NotPending), Error::Io(IoError::NotPending));
        assert_eq!(Error::from(DongleError::GetCapab), Error::Dongle(DongleError::GetCapab));
    }

    #[test]
    fn error_display_prefixes_domain() {
        let display = format!("{}", Error::Dongle(DongleError::GetCapab));
        assert!(display.starts_with("dongle: "));
        assert!(display.contains("capabilities"));

        let display = format!("{}", Error::Io(IoError::TransmitUnderrun));
        assert!(display.starts_with("io: "));
    }

    #[test]
    fn result_aliases_work() {
        fn dongle() -> DongleResult<u8> {
            Err(DongleError::Unsupported)
        }
        fn unified() -> Result<u8> {
            Ok(dongle().unwrap_or(7))
        }

        assert!(dongle().is_err());
        assert_eq!(unified().unwrap(), 7);
    }
}
