//! Host (NDIS wrapper) boundary
//!
//! Everything the engine needs from the surrounding network stack and OS:
//! packet upcalls, the turnaround timer, and the waits used by halt. Port
//! and DMA access live in [`crate::hal`].

use crate::internal::constants::{IR_ADDR_SIZE, IR_CONTROL_SIZE};

/// Outcome reported to the protocol stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NdisStatus {
    /// Completed
    Success,
    /// Failed
    Failure,
    /// Completion will be reported later
    Pending,
    /// Dropped because the adapter is resetting
    ResetInProgress,
    /// Traffic detected on the medium
    MediaBusy,
    /// OID or operation not supported
    NotSupported,
    /// Information buffer has the wrong size
    InvalidLength,
    /// Information buffer holds a bad value
    InvalidData,
    /// Information buffer too short for the reply
    BufferTooShort,
    /// Out of resources
    Resources,
}

impl NdisStatus {
    /// Check for [`NdisStatus::Success`]
    pub const fn is_success(self) -> bool {
        matches!(self, NdisStatus::Success)
    }
}

/// Events halt blocks on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HaltEvent {
    /// Every packet indicated to the protocol has been returned
    ReceiveStopped,
    /// The in-flight send completed and the queue is idle
    SendStopped,
}

/// Handle naming a receive slot held by the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxToken(pub(crate) u8);

impl RxToken {
    /// Slot index behind the token
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A received frame handed to the protocol
///
/// `data` is the frame without FCS. The bytes stay untouched until the slot
/// comes back through [`return_packet`](crate::NscIrda::return_packet) when
/// the indication returned [`NdisStatus::Pending`].
#[derive(Debug, Clone, Copy)]
pub struct RxPacket<'a> {
    /// Slot handle to return
    pub token: RxToken,
    /// Frame bytes (address, control, I-field)
    pub data: &'a [u8],
    /// IrLAP header length at the start of `data`
    pub header_size: usize,
}

impl<'a> RxPacket<'a> {
    pub(crate) fn new(token: RxToken, data: &'a [u8]) -> Self {
        Self {
            token,
            data,
            header_size: IR_ADDR_SIZE + IR_CONTROL_SIZE,
        }
    }
}

/// Outgoing packet as the protocol hands it down
pub trait IrPacket {
    /// Buffer chain making up the frame (address, control, I-field)
    fn fragments(&self) -> impl Iterator<Item = &[u8]>;

    /// Silence required before this packet goes out, in microseconds
    fn min_turnaround_usec(&self) -> u32;

    /// Extra BOFs requested for SIR transmission
    fn extra_bofs(&self) -> u32;
}

/// Upcalls and services provided by the host
///
/// All methods may be called from DPC context and are never called with an
/// engine lock held.
pub trait NdisHost {
    /// Packet type carried by `send_packets`
    type Packet: IrPacket;

    /// Indicate a received frame; return [`NdisStatus::Pending`] to keep it
    fn indicate_receive(&self, packet: RxPacket<'_>) -> NdisStatus;

    /// Hand a sent (or failed) packet back to the protocol
    fn send_complete(&self, packet: Self::Packet, status: NdisStatus);

    /// Report a status indication (media busy)
    fn indicate_status(&self, status: NdisStatus);

    /// Arm the one-shot turnaround timer; expiry calls
    /// [`turnaround_timer_expired`](crate::NscIrda::turnaround_timer_expired)
    fn set_turnaround_timer(&self, ms: u32);

    /// Cancel the turnaround timer; true if it had not fired yet
    fn cancel_turnaround_timer(&self) -> bool;

    /// Sleep at passive level
    fn sleep_ms(&self, ms: u32);

    /// Block until `event` is set or `timeout_ms` passes; true if set
    fn wait_event(&self, event: HaltEvent, timeout_ms: u32) -> bool;

    /// Signal `event`
    fn set_event(&self, event: HaltEvent);
}
