//! Query and set information (OIDs)
//!
//! Values travel as little-endian `u32`s unless noted. A query writes into
//! the caller's buffer and returns the bytes written; a set returns the
//! bytes read.

use core::fmt;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::dongle::{DongleCaps, DongleChannel};
use crate::framing::RxState;
use crate::hal::{DmaChannel, PortIo};
use crate::host::{NdisHost, NdisStatus};
use crate::internal::constants::{
    MAX_I_DATA_SIZE, MAX_IRDA_DATA_SIZE, MAX_NDIS_DATA_SIZE, MAX_RECEIVE_WINDOW_SIZE,
    MAX_SEND_WINDOW_SIZE, NDIS_DRIVER_VERSION, VENDOR_DRIVER_VERSION, VENDOR_ID,
};
use crate::internal::register::ier;

use super::adapter::NscIrda;
use super::speed::BaudRate;
use super::state::SpeedChange;

// =============================================================================
// OID Codes
// =============================================================================

/// OIDs this adapter answers
pub const OID_GEN_SUPPORTED_LIST: u32 = 0x0001_0101;
/// Hardware status ([`HardwareStatus`](super::config::HardwareStatus))
pub const OID_GEN_HARDWARE_STATUS: u32 = 0x0001_0102;
/// Medium type supported
pub const OID_GEN_MEDIA_SUPPORTED: u32 = 0x0001_0103;
/// Medium type in use
pub const OID_GEN_MEDIA_IN_USE: u32 = 0x0001_0104;
/// Largest lookahead the adapter can provide
pub const OID_GEN_MAXIMUM_LOOKAHEAD: u32 = 0x0001_0105;
/// Largest frame without media header
pub const OID_GEN_MAXIMUM_FRAME_SIZE: u32 = 0x0001_0106;
/// Current speed in units of 100 bps
pub const OID_GEN_LINK_SPEED: u32 = 0x0001_0107;
/// Transmit buffer bytes
pub const OID_GEN_TRANSMIT_BUFFER_SPACE: u32 = 0x0001_0108;
/// Receive buffer bytes
pub const OID_GEN_RECEIVE_BUFFER_SPACE: u32 = 0x0001_0109;
/// Transmit allocation unit
pub const OID_GEN_TRANSMIT_BLOCK_SIZE: u32 = 0x0001_010A;
/// Receive allocation unit
pub const OID_GEN_RECEIVE_BLOCK_SIZE: u32 = 0x0001_010B;
/// Vendor ID
pub const OID_GEN_VENDOR_ID: u32 = 0x0001_010C;
/// Vendor description string (NUL-terminated)
pub const OID_GEN_VENDOR_DESCRIPTION: u32 = 0x0001_010D;
/// Packet filter
pub const OID_GEN_CURRENT_PACKET_FILTER: u32 = 0x0001_010E;
/// Lookahead requested by the protocol
pub const OID_GEN_CURRENT_LOOKAHEAD: u32 = 0x0001_010F;
/// NDIS version (`u16`, major.minor)
pub const OID_GEN_DRIVER_VERSION: u32 = 0x0001_0110;
/// Largest packet including header
pub const OID_GEN_MAXIMUM_TOTAL_SIZE: u32 = 0x0001_0111;
/// MAC option flags
pub const OID_GEN_MAC_OPTIONS: u32 = 0x0001_0113;
/// Media connect state
pub const OID_GEN_MEDIA_CONNECT_STATUS: u32 = 0x0001_0114;
/// Packets per `send_packets` call
pub const OID_GEN_MAXIMUM_SEND_PACKETS: u32 = 0x0001_0115;
/// Vendor driver version
pub const OID_GEN_VENDOR_DRIVER_VERSION: u32 = 0x0001_0116;

/// A frame is being received
pub const OID_IRDA_RECEIVING: u32 = 0x0A01_0100;
/// Transceiver turnaround time in microseconds
pub const OID_IRDA_TURNAROUND_TIME: u32 = 0x0A01_0101;
/// Supported speeds, one `u32` bps value each
pub const OID_IRDA_SUPPORTED_SPEEDS: u32 = 0x0A01_0102;
/// Link speed in bps
pub const OID_IRDA_LINK_SPEED: u32 = 0x0A01_0103;
/// Traffic seen since the last reset of the flag
pub const OID_IRDA_MEDIA_BUSY: u32 = 0x0A01_0104;
/// Extra BOFs the transceiver needs at 115200 bps
pub const OID_IRDA_EXTRA_RCV_BOFS: u32 = 0x0A01_0200;
/// IrLAP receive window
pub const OID_IRDA_MAX_RECEIVE_WINDOW_SIZE: u32 = 0x0A01_0204;
/// IrLAP send window
pub const OID_IRDA_MAX_SEND_WINDOW_SIZE: u32 = 0x0A01_0205;

/// Every OID answered by [`NscIrda::query_information`]
pub const SUPPORTED_OIDS: [u32; 29] = [
    OID_GEN_SUPPORTED_LIST,
    OID_GEN_HARDWARE_STATUS,
    OID_GEN_MEDIA_SUPPORTED,
    OID_GEN_MEDIA_IN_USE,
    OID_GEN_MAXIMUM_LOOKAHEAD,
    OID_GEN_MAXIMUM_FRAME_SIZE,
    OID_GEN_LINK_SPEED,
    OID_GEN_TRANSMIT_BUFFER_SPACE,
    OID_GEN_RECEIVE_BUFFER_SPACE,
    OID_GEN_TRANSMIT_BLOCK_SIZE,
    OID_GEN_RECEIVE_BLOCK_SIZE,
    OID_GEN_VENDOR_ID,
    OID_GEN_VENDOR_DESCRIPTION,
    OID_GEN_CURRENT_PACKET_FILTER,
    OID_GEN_CURRENT_LOOKAHEAD,
    OID_GEN_DRIVER_VERSION,
    OID_GEN_MAXIMUM_TOTAL_SIZE,
    OID_GEN_MAC_OPTIONS,
    OID_GEN_MEDIA_CONNECT_STATUS,
    OID_GEN_MAXIMUM_SEND_PACKETS,
    OID_GEN_VENDOR_DRIVER_VERSION,
    OID_IRDA_RECEIVING,
    OID_IRDA_TURNAROUND_TIME,
    OID_IRDA_SUPPORTED_SPEEDS,
    OID_IRDA_LINK_SPEED,
    OID_IRDA_MEDIA_BUSY,
    OID_IRDA_EXTRA_RCV_BOFS,
    OID_IRDA_MAX_RECEIVE_WINDOW_SIZE,
    OID_IRDA_MAX_SEND_WINDOW_SIZE,
];

/// `NdisMediumIrda`
pub const NDIS_MEDIUM_IRDA: u32 = 10;
/// `NdisMediaStateConnected`
pub const NDIS_MEDIA_STATE_CONNECTED: u32 = 0;
/// Copy-lookahead-data plus transfers-not-pend
pub const MAC_OPTIONS: u32 = 0x0000_0001 | 0x0000_0002;
/// Packets accepted per `send_packets` call
pub const MAXIMUM_SEND_PACKETS: u32 = 16;
/// `OID_GEN_VENDOR_DESCRIPTION` reply
pub const VENDOR_DESCRIPTION: &[u8] = b"NSC Infrared Port\0";

// =============================================================================
// Errors
// =============================================================================

/// Why an OID request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OidError {
    /// OID unknown, or not settable
    NotSupported,
    /// Set buffer too short for the value
    InvalidLength,
    /// Value out of range
    InvalidData,
    /// Valid request the hardware refused
    Failure,
    /// Query buffer too short; `needed` bytes are required
    BufferTooShort {
        /// Bytes the reply needs
        needed: usize,
    },
}

impl OidError {
    /// Matching NDIS status
    pub const fn status(self) -> NdisStatus {
        match self {
            OidError::NotSupported => NdisStatus::NotSupported,
            OidError::InvalidLength => NdisStatus::InvalidLength,
            OidError::InvalidData => NdisStatus::InvalidData,
            OidError::Failure => NdisStatus::Failure,
            OidError::BufferTooShort { .. } => NdisStatus::BufferTooShort,
        }
    }
}

impl fmt::Display for OidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OidError::NotSupported => f.write_str("OID not supported"),
            OidError::InvalidLength => f.write_str("information buffer has the wrong length"),
            OidError::InvalidData => f.write_str("information buffer holds an invalid value"),
            OidError::Failure => f.write_str("request failed"),
            OidError::BufferTooShort { needed } => {
                write!(f, "information buffer too short, {needed} bytes needed")
            }
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

fn put_u32(buf: &mut [u8], value: u32) -> Result<usize, OidError> {
    put_bytes(buf, &value.to_le_bytes())
}

fn put_bytes(buf: &mut [u8], bytes: &[u8]) -> Result<usize, OidError> {
    let out = buf.get_mut(..bytes.len()).ok_or(OidError::BufferTooShort {
        needed: bytes.len(),
    })?;
    out.copy_from_slice(bytes);
    Ok(bytes.len())
}

fn put_u32_list<I>(buf: &mut [u8], values: I) -> Result<usize, OidError>
where
    I: Iterator<Item = u32> + Clone,
{
    let needed = values.clone().count() * 4;
    if buf.len() < needed {
        return Err(OidError::BufferTooShort { needed });
    }
    for (chunk, value) in buf.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    Ok(needed)
}

fn get_u32(buf: &[u8]) -> Result<u32, OidError> {
    let bytes = buf.get(..4).ok_or(OidError::InvalidLength)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Rates set in an NDIS speed mask, slowest first
fn speeds_in(mask: u32) -> impl Iterator<Item = u32> + Clone {
    BaudRate::ALL
        .into_iter()
        .filter(move |rate| mask & rate.ndis_code() != 0)
        .map(BaudRate::bits_per_sec)
}

impl<B, M, H, D> NscIrda<B, M, H, D>
where
    B: PortIo,
    M: DmaChannel,
    H: NdisHost,
    D: DelayNs,
{
    fn dongle_caps(&self) -> DongleCaps {
        self.queue.with(|q| {
            let param = q.dongles.param(DongleChannel::A);
            if param.valid {
                param.caps
            } else {
                DongleCaps::sir_only()
            }
        })
    }

    /// Answer a query OID into `buf`
    ///
    /// # Errors
    ///
    /// [`OidError::NotSupported`] for unknown OIDs and
    /// [`OidError::BufferTooShort`] when `buf` cannot hold the reply.
    pub fn query_information(&self, oid: u32, buf: &mut [u8]) -> Result<usize, OidError> {
        let buffer_space = MAX_IRDA_DATA_SIZE as u32;
        match oid {
            OID_GEN_SUPPORTED_LIST => put_u32_list(buf, SUPPORTED_OIDS.iter().copied()),
            OID_GEN_HARDWARE_STATUS => put_u32(buf, self.hardware_status() as u32),
            OID_GEN_MEDIA_SUPPORTED | OID_GEN_MEDIA_IN_USE => put_u32(buf, NDIS_MEDIUM_IRDA),
            OID_GEN_MAXIMUM_LOOKAHEAD => put_u32(buf, MAX_I_DATA_SIZE as u32),
            OID_GEN_MAXIMUM_FRAME_SIZE | OID_GEN_MAXIMUM_TOTAL_SIZE => {
                put_u32(buf, MAX_NDIS_DATA_SIZE as u32)
            }
            OID_GEN_LINK_SPEED => put_u32(buf, self.current_speed().bits_per_sec() / 100),
            OID_GEN_TRANSMIT_BUFFER_SPACE
            | OID_GEN_RECEIVE_BUFFER_SPACE
            | OID_GEN_TRANSMIT_BLOCK_SIZE
            | OID_GEN_RECEIVE_BLOCK_SIZE => put_u32(buf, buffer_space),
            OID_GEN_VENDOR_ID => put_u32(buf, VENDOR_ID),
            OID_GEN_VENDOR_DESCRIPTION => put_bytes(buf, VENDOR_DESCRIPTION),
            OID_GEN_CURRENT_PACKET_FILTER => put_u32(buf, self.queue.with(|q| q.packet_filter)),
            OID_GEN_CURRENT_LOOKAHEAD => put_u32(buf, self.queue.with(|q| q.lookahead)),
            OID_GEN_DRIVER_VERSION => put_bytes(buf, &NDIS_DRIVER_VERSION.to_le_bytes()),
            OID_GEN_MAC_OPTIONS => put_u32(buf, MAC_OPTIONS),
            OID_GEN_MEDIA_CONNECT_STATUS => put_u32(buf, NDIS_MEDIA_STATE_CONNECTED),
            OID_GEN_MAXIMUM_SEND_PACKETS => put_u32(buf, MAXIMUM_SEND_PACKETS),
            OID_GEN_VENDOR_DRIVER_VERSION => put_u32(buf, VENDOR_DRIVER_VERSION),

            OID_IRDA_RECEIVING => {
                let receiving = self.intr.with(|s| {
                    if s.speed.is_sir() {
                        s.sir_rx.state() != RxState::Init
                    } else {
                        s.fir.rx_ready || s.fir.int_mask == ier::FIR_TIMER_MODE
                    }
                });
                put_u32(buf, u32::from(receiving))
            }
            OID_IRDA_TURNAROUND_TIME => put_u32(buf, self.dongle_caps().turnaround_usec),
            OID_IRDA_SUPPORTED_SPEEDS => {
                let mask = self.queue.with(|q| q.supported_speeds);
                put_u32_list(buf, speeds_in(mask))
            }
            OID_IRDA_LINK_SPEED => put_u32(buf, self.current_speed().bits_per_sec()),
            OID_IRDA_MEDIA_BUSY => put_u32(buf, u32::from(self.intr.with(|s| s.media_busy))),
            OID_IRDA_EXTRA_RCV_BOFS => put_u32(buf, self.dongle_caps().extra_bofs),
            OID_IRDA_MAX_RECEIVE_WINDOW_SIZE => put_u32(buf, MAX_RECEIVE_WINDOW_SIZE),
            OID_IRDA_MAX_SEND_WINDOW_SIZE => put_u32(buf, MAX_SEND_WINDOW_SIZE),
            _ => {
                debug!("query of unsupported OID {oid:#010x}");
                Err(OidError::NotSupported)
            }
        }
    }

    /// Apply a set OID from `buf`
    ///
    /// A link speed change requested while a packet is staged or sending is
    /// applied after that packet completes.
    ///
    /// # Errors
    ///
    /// - [`OidError::InvalidLength`] when `buf` is shorter than the value
    /// - [`OidError::InvalidData`] for a speed not in the supported set or an
    ///   oversized lookahead
    /// - [`OidError::NotSupported`] for OIDs that cannot be set
    pub fn set_information(&self, oid: u32, buf: &[u8]) -> Result<usize, OidError> {
        match oid {
            OID_IRDA_LINK_SPEED => {
                let bps = get_u32(buf)?;
                self.set_link_speed(bps)?;
                Ok(4)
            }
            OID_IRDA_MEDIA_BUSY => {
                get_u32(buf)?;
                self.intr.with(|s| {
                    s.media_busy = false;
                    s.have_indicated_media_busy = false;
                });
                Ok(4)
            }
            OID_GEN_CURRENT_PACKET_FILTER => {
                let filter = get_u32(buf)?;
                self.queue.with(|q| q.packet_filter = filter);
                Ok(4)
            }
            OID_GEN_CURRENT_LOOKAHEAD => {
                let lookahead = get_u32(buf)?;
                if lookahead as usize > MAX_I_DATA_SIZE {
                    return Err(OidError::InvalidData);
                }
                self.queue.with(|q| q.lookahead = lookahead);
                Ok(4)
            }
            _ => {
                debug!("set of unsupported OID {oid:#010x}");
                Err(OidError::NotSupported)
            }
        }
    }

    fn set_link_speed(&self, bps: u32) -> Result<(), OidError> {
        let rate = BaudRate::from_bps(bps).ok_or(OidError::InvalidData)?;
        let applied = {
            let mut guard = self.queue.lock();
            let q = &mut *guard;
            if q.supported_speeds & rate.ndis_code() == 0 {
                warn!("link speed {rate} not supported (mask {:#05x})", q.supported_speeds);
                return Err(OidError::InvalidData);
            }
            q.link_speed = rate;
            match q.transmit.current_ticket() {
                Some(ticket) => {
                    info!("link speed {rate} after packet {ticket}");
                    q.speed_change = SpeedChange::AfterPacket(ticket);
                    self.intr.with(|s| {
                        if s.sir_write_pending {
                            s.sir_tx.set_flush(true);
                        }
                    });
                    None
                }
                None => {
                    q.speed_change = SpeedChange::Stable;
                    let result = self.set_speed(q);
                    q.transmit_idle = false;
                    Some(result)
                }
            }
        };
        let Some(result) = applied else {
            return Ok(());
        };
        self.process_send_queue();
        result.map_err(|e| {
            warn!("link speed change failed: {e}");
            OidError::Failure
        })
    }
}
