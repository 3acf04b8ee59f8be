//! Adapter state, split by lock
//!
//! | Struct          | Lock                     | Touched by                |
//! |-----------------|--------------------------|---------------------------|
//! | [`IsrState`]    | `InterruptLock`          | ISR; DPC/thread via sync  |
//! | [`QueueState`]  | `QueueLock`              | DPC and thread level      |
//!
//! The receive data itself lives in the [`RxArena`](super::arena::RxArena),
//! outside both.

use heapless::Deque;

use crate::dongle::{DongleVendor, Dongles};
use crate::framing::{SirReceiver, SirTransmitter};
use crate::hal::dma::DmaUtil;
use crate::internal::constants::{MAX_NDIS_DATA_SIZE, SEND_QUEUE_DEPTH};

use super::config::HardwareStatus;
use super::rx_pool::{RxPool, Span};
use super::speed::BaudRate;

// =============================================================================
// Statistics
// =============================================================================

/// Error and traffic counters
///
/// All counters wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegStats {
    /// SIR frames dropped for a bad FCS
    pub sir_bad_fcs: u32,
    /// SIR line status errors (framing, parity, break)
    pub sir_line_errors: u32,
    /// SIR receive FIFO overruns
    pub sir_overruns: u32,
    /// SIR frames aborted by an illegal byte sequence
    pub sir_aborted: u32,
    /// SIR frames shorter than address + control + FCS
    pub sir_runts: u32,
    /// SIR frames longer than the receive buffer
    pub sir_overflows: u32,
    /// FIR/MIR frames with a CRC error
    pub fir_crc_errors: u32,
    /// FIR/MIR receive or status FIFO overruns
    pub fir_fifo_overruns: u32,
    /// FIR/MIR physical layer errors
    pub fir_phy_errors: u32,
    /// FIR/MIR frames over the programmed maximum length
    pub fir_max_len_errors: u32,
    /// Frames the status FIFO reported as lost
    pub fir_lost_frames: u32,
    /// FIR/MIR frames with an impossible length
    pub fir_bad_lengths: u32,
    /// Status FIFO ran ahead of the DMA transfer
    pub fir_desyncs: u32,
    /// Frames discarded after a desync or stale status entry
    pub fir_discarded: u32,
    /// Bytes drained from the RX FIFO while recovering from a desync
    pub fir_drained_bytes: u32,
    /// Frames dropped because no receive slot was free
    pub rx_no_slot: u32,
    /// Receive could not start because the DMA ring was fully leased
    pub rx_window_starved: u32,
    /// FIR/MIR transmit underruns
    pub tx_underruns: u32,
    /// Frames indicated to the protocol
    pub packets_received: u32,
    /// Packets completed successfully
    pub packets_sent: u32,
    /// Receive slots returned by the protocol
    pub packets_returned: u32,
}

#[inline]
pub(crate) fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}

// =============================================================================
// FIR/MIR engine
// =============================================================================

/// DMA engine state for the hardware-framed speeds
pub(crate) struct FirState<M> {
    /// Shared channel bookkeeping
    pub dma: DmaUtil<M>,
    /// Receive DMA owns the channel
    pub rx_active: bool,
    /// Transmit DMA owns the channel
    pub tx_pending: bool,
    /// Ring window of the active (or last) receive transfer
    pub rx_window: Span,
    /// DMA count sampled at the last settle check
    pub last_dma_count: u32,
    /// Settle timer re-arms for the current window
    pub settle_rearms: u32,
    /// Frames are waiting for the DPC
    pub rx_ready: bool,
    /// Drop the next status FIFO entry unconditionally
    pub discard_next: bool,
    /// Interrupt enables while in FIR/MIR mode
    pub int_mask: u8,
    /// Linear transmit frame
    pub tx_buf: [u8; MAX_NDIS_DATA_SIZE],
}

impl<M> FirState<M> {
    pub fn new(dma: DmaUtil<M>) -> Self {
        Self {
            dma,
            rx_active: false,
            tx_pending: false,
            rx_window: Span::default(),
            last_dma_count: 0,
            settle_rearms: 0,
            rx_ready: false,
            discard_next: false,
            int_mask: 0,
            tx_buf: [0; MAX_NDIS_DATA_SIZE],
        }
    }
}

// =============================================================================
// Interrupt-synchronized state
// =============================================================================

/// Everything the ISR reads or writes
pub(crate) struct IsrState<M> {
    /// Speed the hardware is programmed for
    pub speed: BaudRate,
    /// Receive slot lists
    pub pool: RxPool,
    /// SIR receive framer
    pub sir_rx: SirReceiver,
    /// SIR transmit feeder
    pub sir_tx: SirTransmitter,
    /// The ISR is feeding `sir_tx` to the UART
    pub sir_write_pending: bool,
    /// The ISR finished the SIR packet; the DPC completes it
    pub sir_tx_done: bool,
    /// UART FIFOs detected during verification
    pub fifo_present: bool,
    /// FIR/MIR engine
    pub fir: FirState<M>,
    /// Bring-up interrupt test armed
    pub testing_interrupt: bool,
    /// Bring-up interrupt test fired
    pub got_test_interrupt: bool,
    /// A BOF was seen since the last media-busy reset
    pub media_busy: bool,
    /// Media busy has been reported to the protocol
    pub have_indicated_media_busy: bool,
    /// Counters
    pub stats: RegStats,
}

impl<M> IsrState<M> {
    pub fn new(dma: DmaUtil<M>) -> Self {
        Self {
            speed: BaudRate::B9600,
            pool: RxPool::new(),
            sir_rx: SirReceiver::new(),
            sir_tx: SirTransmitter::new(),
            sir_write_pending: false,
            sir_tx_done: false,
            fifo_present: false,
            fir: FirState::new(dma),
            testing_interrupt: false,
            got_test_interrupt: false,
            media_busy: false,
            have_indicated_media_busy: false,
            stats: RegStats::default(),
        }
    }

    /// Counters including the framer's own
    pub fn snapshot_stats(&self) -> RegStats {
        let framer = self.sir_rx.stats();
        RegStats {
            sir_aborted: framer.aborted,
            sir_runts: framer.runts,
            sir_overflows: framer.overflows,
            ..self.stats
        }
    }
}

// =============================================================================
// Queue-locked state
// =============================================================================

/// Packet accepted by `send_packets`
#[derive(Debug)]
pub(crate) struct Queued<P> {
    /// Monotonic identity used by the speed-change marker
    pub ticket: u32,
    /// Protocol packet
    pub packet: P,
}

/// Transmit path state
#[derive(Debug)]
pub(crate) enum Transmit<P> {
    /// No current packet
    Idle,
    /// Dequeued, waiting for the turnaround timer
    Staged(Queued<P>),
    /// Handed to the SIR feeder or transmit DMA
    Sending(Queued<P>),
}

impl<P> Default for Transmit<P> {
    fn default() -> Self {
        Transmit::Idle
    }
}

impl<P> Transmit<P> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Transmit::Idle)
    }

    /// Ticket of the current packet, staged or sending
    pub fn current_ticket(&self) -> Option<u32> {
        match self {
            Transmit::Idle => None,
            Transmit::Staged(q) | Transmit::Sending(q) => Some(q.ticket),
        }
    }
}

/// Deferred speed change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SpeedChange {
    /// Nothing pending
    #[default]
    Stable,
    /// Apply the requested speed once this ticket completes
    AfterPacket(u32),
}

/// Send queue and coordinator state
pub(crate) struct QueueState<P, D> {
    pub send_queue: Deque<Queued<P>, SEND_QUEUE_DEPTH>,
    pub transmit: Transmit<P>,
    pub speed_change: SpeedChange,
    /// Requested link speed (`linkSpeedInfo`)
    pub link_speed: BaudRate,
    pub dongles: Dongles,
    pub delay: D,
    pub initialized: bool,
    pub halting: bool,
    pub transmit_idle: bool,
    pub packets_sent_to_protocol: u32,
    pub hardware_status: HardwareStatus,
    pub hang_check: u32,
    pub packet_filter: u32,
    pub lookahead: u32,
    pub supported_speeds: u32,
    pub next_ticket: u32,
}

impl<P, D> QueueState<P, D> {
    pub fn new(dongle_types: [DongleVendor; 2], delay: D, lookahead: u32) -> Self {
        Self {
            send_queue: Deque::new(),
            transmit: Transmit::Idle,
            speed_change: SpeedChange::Stable,
            link_speed: BaudRate::B9600,
            dongles: Dongles::new(dongle_types),
            delay,
            initialized: false,
            halting: false,
            transmit_idle: false,
            packets_sent_to_protocol: 0,
            hardware_status: HardwareStatus::Initializing,
            hang_check: 0,
            packet_filter: 0,
            lookahead,
            supported_speeds: 0,
            next_ticket: 0,
        }
    }

    /// Wrap `packet` with the next ticket
    pub fn ticket(&mut self, packet: P) -> Queued<P> {
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        Queued { ticket, packet }
    }

    /// Check if the speed change waits on `ticket`
    pub fn speed_change_after(&self, ticket: u32) -> bool {
        self.speed_change == SpeedChange::AfterPacket(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockDma;

    #[test]
    fn tickets_are_sequential() {
        let mut q: QueueState<u8, ()> = QueueState::new([DongleVendor::GenericSir; 2], (), 0);
        assert_eq!(q.ticket(10).ticket, 0);
        assert_eq!(q.ticket(11).ticket, 1);
    }

    #[test]
    fn transmit_reports_current_ticket() {
        let mut q: QueueState<u8, ()> = QueueState::new([DongleVendor::GenericSir; 2], (), 0);
        assert_eq!(q.transmit.current_ticket(), None);
        let p = q.ticket(1);
        q.transmit = Transmit::Staged(p);
        assert_eq!(q.transmit.current_ticket(), Some(0));
        assert!(!q.transmit.is_idle());
    }

    #[test]
    fn speed_change_marker_matches_ticket() {
        let mut q: QueueState<u8, ()> = QueueState::new([DongleVendor::GenericSir; 2], (), 0);
        q.speed_change = SpeedChange::AfterPacket(4);
        assert!(q.speed_change_after(4));
        assert!(!q.speed_change_after(5));
    }

    #[test]
    fn snapshot_merges_framer_counters() {
        let mut s: IsrState<MockDma> = IsrState::new(DmaUtil::new(MockDma::new()));
        s.stats.sir_bad_fcs = 3;
        let snap = s.snapshot_stats();
        assert_eq!(snap.sir_bad_fcs, 3);
        assert_eq!(snap.sir_aborted, 0);
    }
}
