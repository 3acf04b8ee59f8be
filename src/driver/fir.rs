//! FIR/MIR DMA frame engine
//!
//! Receive runs one DMA transfer over the largest unleased span of the ring.
//! The hardware records frame boundaries in an eight-entry status FIFO; a
//! frame-end event arms a short timer, and the transfer is only torn down
//! once the DMA count stops moving. The DPC then walks the status FIFO and
//! leases each good frame's bytes to a receive slot in place.
//!
//! All functions here run inside the interrupt lock.

use embedded_hal::delay::DelayNs;
use log::{debug, error, trace, warn};

use crate::error::{DmaError, DmaResult, IoError, Result};
use crate::framing::convert::ndis_to_fir_packet;
use crate::hal::{DmaChannel, PortIo};
use crate::host::{IrPacket, NdisHost, NdisStatus};
use crate::internal::constants::{
    FIR_RX_DESYNC_DRAIN_LIMIT, FIR_RX_MAX_SETTLE_REARMS, FIR_RX_SETTLE_TICKS,
    FIR_TX_FIFO_DRAIN_POLLS, FIR_TX_READY_POLLS, MAX_NDIS_DATA_SIZE, RCV_DMA_LOW_WATER,
    RCV_DMA_SIZE, STATUS_FIFO_DEPTH,
};
use crate::internal::register::{
    ascr, bank0, bank2, bank4, bank5, excr1, fcr, frm_st, ier, ircr1, lsr,
};

use super::adapter::NscIrda;
use super::interrupt::{FirEvents, IsrOutcome};
use super::rx_pool::RxStorage;
use super::state::{bump, IsrState, RegStats};

/// One status FIFO entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameStatus {
    status: u8,
    len: usize,
}

fn count_frame_errors(stats: &mut RegStats, status: u8) {
    if status & frm_st::BAD_CRC != 0 {
        bump(&mut stats.fir_crc_errors);
    }
    if status & (frm_st::OVR1 | frm_st::OVR2) != 0 {
        bump(&mut stats.fir_fifo_overruns);
    }
    if status & frm_st::PHY_ERR != 0 {
        bump(&mut stats.fir_phy_errors);
    }
    if status & frm_st::MAX_LEN != 0 {
        bump(&mut stats.fir_max_len_errors);
    }
}

impl<B, M, H, D> NscIrda<B, M, H, D>
where
    B: PortIo,
    M: DmaChannel,
    H: NdisHost,
    D: DelayNs,
{
    // =========================================================================
    // ISR
    // =========================================================================

    pub(super) fn fir_isr(&self, s: &mut IsrState<M>) -> IsrOutcome {
        let eir = self.port.read(bank0::IIR_FCR);
        let events = FirEvents::from_raw(eir & s.fir.int_mask);
        if !events.any() {
            return IsrOutcome::NOT_OURS;
        }

        let deferred = if s.fir.tx_pending {
            true
        } else if s.fir.rx_active {
            if events.timer {
                self.fir_settle_check(s)
            } else if events.dma {
                s.fir.rx_ready = true;
                true
            } else if events.frame_end() {
                self.fir_arm_settle_timer(s, true);
                false
            } else {
                false
            }
        } else {
            trace!("FIR event {eir:#04x} with nothing active");
            false
        };

        if deferred {
            self.port.write_bank_reg(4, bank4::IRCR1, 0);
        }
        IsrOutcome::claimed(deferred)
    }

    fn fir_arm_settle_timer(&self, s: &mut IsrState<M>, first: bool) {
        let [lo, hi] = FIR_RX_SETTLE_TICKS.to_le_bytes();
        self.port.write_bank_reg(4, bank4::TMRL, lo);
        self.port.write_bank_reg(4, bank4::TMRH, hi);
        s.fir.last_dma_count = s.fir.dma.remaining();
        if first {
            s.fir.settle_rearms = 0;
        } else {
            s.fir.settle_rearms += 1;
        }
        s.fir.int_mask = ier::FIR_TIMER_MODE;
        self.port.write_bank_reg(4, bank4::IRCR1, ircr1::TMR_EN);
        self.port.write(bank0::IER, s.fir.int_mask);
    }

    /// Timer expiry: true once the transfer is quiet and can be torn down
    fn fir_settle_check(&self, s: &mut IsrState<M>) -> bool {
        let remaining = s.fir.dma.remaining();
        if remaining == 0 {
            s.fir.rx_ready = true;
            return true;
        }
        let fifo_level = self.port.read_bank_reg(2, bank2::RXFLV) & bank2::FIFO_LEVEL_MASK;
        let moving = remaining < s.fir.last_dma_count || fifo_level > 0;
        if moving && s.fir.settle_rearms < FIR_RX_MAX_SETTLE_REARMS {
            self.fir_arm_settle_timer(s, false);
            return false;
        }
        s.fir.rx_ready = true;
        true
    }

    // =========================================================================
    // Receive
    // =========================================================================

    /// Start receive DMA over the largest unleased span of the ring
    ///
    /// # Errors
    ///
    /// [`DmaError::NoSpace`] when every byte of the ring is leased; receive
    /// resumes when the protocol returns a buffer.
    pub(super) fn fir_setup_recv(&self, s: &mut IsrState<M>) -> DmaResult<()> {
        let span = s.pool.largest_free_span(RCV_DMA_SIZE);

        let stale = (0..STATUS_FIFO_DEPTH)
            .map_while(|_| self.read_frame_status())
            .count();
        if stale > 0 {
            error!("{stale} status FIFO entries outside any receive window");
            s.fir.discard_next = true;
        }

        if span.len == 0 {
            warn!("receive ring fully leased, receive stalled");
            bump(&mut s.stats.rx_window_starved);
            s.fir.rx_active = false;
            return Err(DmaError::NoSpace);
        }
        if span.len < RCV_DMA_LOW_WATER {
            debug!("receive window down to {} bytes", span.len);
        }

        s.fir.rx_window = span;
        s.fir.rx_ready = false;
        s.fir.settle_rearms = 0;
        self.port.write_bank_reg(2, bank2::EXCR1, excr1::RX_DMA);
        // SAFETY: `span` is disjoint from every full and pending lease.
        let window = unsafe { self.arena.ring_window_mut(span) };
        if let Err(e) = s.fir.dma.start_transfer_from_device(window, 0, span.len) {
            error!("receive DMA setup failed: {e}");
            s.fir.rx_active = false;
            return Err(e);
        }
        s.fir.last_dma_count = s.fir.dma.remaining();
        s.fir.rx_active = true;
        s.fir.int_mask = ier::FIR_RCV_MODE;
        trace!("receive window {}+{}", span.offset, span.len);
        Ok(())
    }

    /// Tear down receive DMA, discarding anything in the window
    pub(super) fn fir_stop_receive(&self, s: &mut IsrState<M>) {
        if !s.fir.rx_active {
            return;
        }
        s.fir.rx_active = false;
        s.fir.rx_ready = false;
        self.port.write_bank_reg(4, bank4::IRCR1, 0);
        // SAFETY: the window is still exclusively the DMA's.
        let window = unsafe { self.arena.ring_window_mut(s.fir.rx_window) };
        if let Err(e) = s.fir.dma.complete_transfer_from_device(window) {
            debug!("receive DMA teardown: {e}");
        }
    }

    /// Stop the transfer, lease every good frame, and restart receive
    pub(super) fn fir_deliver_frames(&self, s: &mut IsrState<M>) {
        s.fir.rx_ready = false;
        s.fir.rx_active = false;
        self.port.write_bank_reg(4, bank4::IRCR1, 0);

        let window = s.fir.rx_window;
        // SAFETY: the transfer is being completed; the window is still the DMA's.
        let ring = unsafe { self.arena.ring_window_mut(window) };
        let transferred = match s.fir.dma.complete_transfer_from_device(ring) {
            Ok(n) => n,
            Err(e) => {
                error!("receive DMA completion failed: {e}");
                0
            }
        };

        let fcs_size = s.speed.fcs_size();
        let mut consumed = 0usize;
        for _ in 0..STATUS_FIFO_DEPTH {
            let Some(FrameStatus { status, len }) = self.read_frame_status() else {
                break;
            };

            if status & frm_st::LOST_FR != 0 {
                debug!("status FIFO reports lost frames");
                bump(&mut s.stats.fir_lost_frames);
                continue;
            }
            if core::mem::take(&mut s.fir.discard_next) {
                bump(&mut s.stats.fir_discarded);
                consumed += len;
                continue;
            }
            if status & frm_st::ERRORS != 0 {
                trace!("frame error {status:#04x}, {len} bytes skipped");
                count_frame_errors(&mut s.stats, status);
                consumed += len;
                continue;
            }
            if consumed + len > transferred {
                warn!(
                    "status FIFO ahead of DMA: {len} byte frame at {consumed}, {transferred} transferred"
                );
                bump(&mut s.stats.fir_desyncs);
                self.fir_drain_rx_fifo(&mut s.stats);
                s.fir.discard_next = true;
                break;
            }
            if len <= fcs_size || len - fcs_size > MAX_NDIS_DATA_SIZE {
                bump(&mut s.stats.fir_bad_lengths);
                consumed += len;
                continue;
            }

            let storage = RxStorage::Dma {
                offset: window.offset + consumed,
            };
            if s.pool.queue_frame(storage, len - fcs_size).is_err() {
                warn!("no free receive slot, FIR frame of {len} bytes dropped");
                bump(&mut s.stats.rx_no_slot);
            }
            consumed += len;
        }

        // starvation is logged and counted inside; return_packet restarts it
        let _ = self.fir_setup_recv(s);
    }

    fn read_frame_status(&self) -> Option<FrameStatus> {
        let status = self.port.read_bank_reg(5, bank5::FRM_ST);
        if status & frm_st::VLD == 0 {
            return None;
        }
        let lo = self.port.read_bank_reg(5, bank5::RFRL_L);
        let hi = self.port.read_bank_reg(5, bank5::RFRL_H);
        Some(FrameStatus {
            status,
            len: usize::from(u16::from_le_bytes([lo, hi])),
        })
    }

    fn fir_drain_rx_fifo(&self, stats: &mut RegStats) {
        for _ in 0..FIR_RX_DESYNC_DRAIN_LIMIT {
            if self.port.read_bank_reg(2, bank2::RXFLV) & bank2::FIFO_LEVEL_MASK == 0 {
                break;
            }
            let _ = self.port.read(bank0::RXD_TXD);
            bump(&mut stats.fir_drained_bytes);
        }
    }

    // =========================================================================
    // Transmit
    // =========================================================================

    /// Copy `packet` out and start transmit DMA
    ///
    /// Receive DMA is torn down first; the channel is shared.
    pub(super) fn fir_start_transmit(&self, s: &mut IsrState<M>, packet: &H::Packet) -> Result<()> {
        let len = ndis_to_fir_packet(packet.fragments(), &mut s.fir.tx_buf)?;
        if len == 0 {
            return Err(IoError::InvalidFrame.into());
        }

        self.fir_stop_receive(s);
        s.fir.tx_pending = true;
        s.fir.int_mask = ier::FIR_XMIT_MODE;
        self.port.write_bank_reg(2, bank2::EXCR1, excr1::TX_DMA);

        let ready = lsr::TXRDY | lsr::TXEMP;
        if !(0..FIR_TX_READY_POLLS).any(|_| self.port.read(bank0::LSR) & ready == ready) {
            debug!("transmitter not idle before DMA start");
        }

        if let Err(e) = s.fir.dma.start_transfer_to_device(&s.fir.tx_buf, 0, len) {
            s.fir.tx_pending = false;
            s.fir.int_mask = 0;
            return Err(e.into());
        }
        trace!("FIR transmit of {len} bytes");
        self.port.write(bank0::IER, s.fir.int_mask);
        Ok(())
    }

    /// Finish the transmit DMA and report the packet's status
    pub(super) fn fir_complete_transmit(&self, s: &mut IsrState<M>) -> NdisStatus {
        s.fir.tx_pending = false;

        let left = s.fir.dma.remaining();
        if left != 0 {
            warn!("transmit DMA completed with {left} bytes left");
        }
        let drained = (0..FIR_TX_FIFO_DRAIN_POLLS)
            .any(|_| self.port.read_bank_reg(2, bank2::TXFLV) & bank2::FIFO_LEVEL_MASK == 0);
        if !drained {
            debug!("transmit FIFO still draining");
        }
        if let Err(e) = s.fir.dma.complete_transfer_to_device() {
            error!("transmit DMA completion failed: {e}");
        }

        if self.port.read(bank0::ASCR) & ascr::TXUR != 0 {
            let lo = self.port.read_bank_reg(4, bank4::TFRCCL);
            let hi = self.port.read_bank_reg(4, bank4::TFRCCH);
            warn!(
                "transmit underrun, {} frames in counter",
                u16::from_le_bytes([lo, hi])
            );
            self.port.write(bank0::IIR_FCR, fcr::RESET_AND_ENABLE);
            self.port.write(bank0::ASCR, ascr::TXUR);
            bump(&mut s.stats.tx_underruns);
            NdisStatus::Failure
        } else {
            bump(&mut s.stats.packets_sent);
            NdisStatus::Success
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::dongle::DongleVendor;
    use crate::driver::config::AdapterConfig;
    use crate::driver::oid::OID_IRDA_LINK_SPEED;
    use crate::host::RxToken;
    use crate::test_utils::{service, test_adapter, MockDma, TestAdapter, TestPacket};
    use std::vec::Vec;

    fn fir_adapter() -> TestAdapter {
        let config =
            AdapterConfig::new().with_dongle_types(DongleVendor::Hp, DongleVendor::GenericSir);
        let adapter = test_adapter(config);
        adapter.initialize().unwrap();
        adapter
            .set_information(OID_IRDA_LINK_SPEED, &4_000_000u32.to_le_bytes())
            .unwrap();
        adapter
    }

    fn dma(adapter: TestAdapter) -> MockDma {
        adapter.intr.with(|s| s.fir.dma.channel().clone())
    }

    fn arrive(adapter: TestAdapter, bytes: &[u8], status: u8) {
        dma(adapter).feed(bytes);
        adapter.port().io().push_status(status, bytes.len() as u16);
        adapter.port().io().raise_eir(ier::LS);
        service(adapter);
    }

    fn frame(n: usize) -> Vec<u8> {
        (0..n).map(|i| i as u8).collect()
    }

    #[test]
    fn speed_change_starts_receive_dma() {
        let adapter = fir_adapter();
        assert!(adapter.intr.with(|s| s.fir.rx_active));
        assert_eq!(adapter.port().io().bank_reg(0, bank0::IER), ier::FIR_RCV_MODE);
        assert_eq!(adapter.intr.with(|s| s.fir.rx_window.len), RCV_DMA_SIZE);
    }

    #[test]
    fn good_frame_is_leased_in_place() {
        let adapter = fir_adapter();
        let bytes = frame(40);
        arrive(adapter, &bytes, frm_st::VLD);

        let received = adapter.host().received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1, &bytes[..36]);
        assert!(adapter.intr.with(|s| s.fir.rx_active));
    }

    #[test]
    fn crc_error_frame_is_discarded() {
        let adapter = fir_adapter();
        arrive(adapter, &frame(40), frm_st::VLD | frm_st::BAD_CRC);

        assert!(adapter.host().received().is_empty());
        assert_eq!(adapter.stats().fir_crc_errors, 1);
        assert!(adapter.intr.with(|s| s.pool.is_conserved()));
    }

    #[test]
    fn frames_after_an_error_keep_their_offsets() {
        let adapter = fir_adapter();
        let first = frame(20);
        let second: Vec<u8> = (100..130).collect();
        dma(adapter).feed(&first);
        dma(adapter).feed(&second);
        adapter.port().io().push_status(frm_st::VLD | frm_st::OVR1, 20);
        adapter.port().io().push_status(frm_st::VLD, 30);
        adapter.port().io().raise_eir(ier::LS);
        service(adapter);

        let received = adapter.host().received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1, &second[..26]);
        assert_eq!(adapter.stats().fir_fifo_overruns, 1);
    }

    #[test]
    fn desync_discards_next_frame() {
        let adapter = fir_adapter();
        dma(adapter).feed(&frame(40));
        adapter.port().io().push_status(frm_st::VLD, 100);
        adapter.port().io().raise_eir(ier::LS);
        service(adapter);
        assert_eq!(adapter.stats().fir_desyncs, 1);
        assert!(adapter.host().received().is_empty());

        arrive(adapter, &frame(40), frm_st::VLD);
        assert!(adapter.host().received().is_empty());
        assert_eq!(adapter.stats().fir_discarded, 1);

        arrive(adapter, &frame(40), frm_st::VLD);
        assert_eq!(adapter.host().received().len(), 1);
    }

    #[test]
    fn runt_frame_is_a_bad_length() {
        let adapter = fir_adapter();
        arrive(adapter, &frame(4), frm_st::VLD);
        assert!(adapter.host().received().is_empty());
        assert_eq!(adapter.stats().fir_bad_lengths, 1);
    }

    #[test]
    fn moving_dma_count_rearms_timer() {
        let adapter = fir_adapter();
        adapter.port().io().set_rx_fifo_level(4);
        adapter.port().io().set_auto_timer(false);
        dma(adapter).feed(&frame(40));
        adapter.port().io().push_status(frm_st::VLD, 40);
        adapter.port().io().raise_eir(ier::LS);
        service(adapter);
        assert_eq!(adapter.intr.with(|s| s.fir.int_mask), ier::FIR_TIMER_MODE);

        adapter.port().io().raise_eir(ier::TMR);
        service(adapter);
        assert_eq!(adapter.intr.with(|s| s.fir.settle_rearms), 1);
        assert!(adapter.host().received().is_empty());

        adapter.port().io().set_rx_fifo_level(0);
        adapter.port().io().raise_eir(ier::TMR);
        service(adapter);
        assert_eq!(adapter.host().received().len(), 1);
    }

    #[test]
    fn leased_ring_starves_until_return() {
        let adapter = fir_adapter();
        adapter.host().set_receive_status(NdisStatus::Pending);
        let token = adapter.intr.with(|s| {
            adapter.fir_stop_receive(s);
            let index = s.pool.queue_frame(RxStorage::Dma { offset: 0 }, RCV_DMA_SIZE).unwrap();
            s.pool.pop_full();
            s.pool.mark_pending(index);
            index
        });
        adapter.queue.with(|q| q.packets_sent_to_protocol += 1);

        let result = adapter.intr.with(|s| adapter.fir_setup_recv(s));
        assert_eq!(result, Err(DmaError::NoSpace));
        assert_eq!(adapter.stats().rx_window_starved, 1);

        adapter.return_packet(RxToken(token));
        assert!(adapter.intr.with(|s| s.fir.rx_active));
        assert_eq!(adapter.intr.with(|s| s.fir.rx_window.len), RCV_DMA_SIZE);
    }

    #[test]
    fn transmit_completes_on_dma_event() {
        let adapter = fir_adapter();
        adapter.send_packets([TestPacket::new(3, &[0xFF, 0x3F, 5, 6, 7])]);
        assert!(adapter.intr.with(|s| s.fir.tx_pending && !s.fir.rx_active));
        assert_eq!(dma(adapter).transmitted(), [std::vec![0xFF, 0x3F, 5, 6, 7]]);

        adapter.port().io().raise_eir(ier::DMA);
        service(adapter);
        assert_eq!(adapter.host().completed(), [(3, NdisStatus::Success)]);
        assert!(adapter.intr.with(|s| s.fir.rx_active));
        assert!(!dma(adapter).overlap_detected());
    }

    #[test]
    fn underrun_fails_packet() {
        let adapter = fir_adapter();
        adapter.send_packets([TestPacket::new(4, &[0xFF, 0x3F, 1])]);
        adapter.port().io().set_tx_underrun(true);
        adapter.port().io().raise_eir(ier::DMA);
        service(adapter);

        assert_eq!(adapter.host().completed(), [(4, NdisStatus::Failure)]);
        assert_eq!(adapter.stats().tx_underruns, 1);
        assert_eq!(adapter.port().io().bank_reg(0, bank0::ASCR) & ascr::TXUR, 0);
    }

    #[test]
    fn dma_setup_failure_fails_packet() {
        let adapter = fir_adapter();
        dma(adapter).fail_next_start();
        adapter.send_packets([TestPacket::new(5, &[0xFF, 0x3F, 1])]);

        assert_eq!(adapter.host().completed(), [(5, NdisStatus::Failure)]);
        assert!(adapter.intr.with(|s| !s.fir.tx_pending && s.fir.rx_active));
    }
}
