//! Receive indication and buffer return

use embedded_hal::delay::DelayNs;
use log::{debug, trace};

use crate::framing::fcs;
use crate::hal::{DmaChannel, PortIo};
use crate::host::{HaltEvent, NdisHost, NdisStatus, RxPacket, RxToken};
use crate::internal::constants::{MIN_SIR_FRAME_SIZE, SLOW_IR_FCS_SIZE};

use super::adapter::NscIrda;
use super::rx_pool::{RxStorage, Span};
use super::state::bump;

impl<B, M, H, D> NscIrda<B, M, H, D>
where
    B: PortIo,
    M: DmaChannel,
    H: NdisHost,
    D: DelayNs,
{
    /// Indicate every completed frame to the protocol, oldest first
    ///
    /// SIR frames are FCS-checked here, outside the ISR. While halting,
    /// frames are dropped back into the pool instead.
    pub(super) fn deliver_full_buffers(&self) {
        loop {
            let next = {
                let mut guard = self.queue.lock();
                let q = &mut *guard;
                let halting = q.halting;
                let next = self.intr.with(|s| {
                    loop {
                        let index = s.pool.pop_full()?;
                        let slot = *s.pool.slot(index);
                        let len = match slot.storage {
                            RxStorage::Sir(buf) => {
                                // SAFETY: the popped slot owns `buf`.
                                let frame = unsafe { self.arena.sir_buffer(buf, slot.len) };
                                if slot.len < MIN_SIR_FRAME_SIZE || !fcs::is_valid(frame) {
                                    trace!("SIR frame of {} bytes failed FCS", slot.len);
                                    bump(&mut s.stats.sir_bad_fcs);
                                    s.pool.release(index);
                                    continue;
                                }
                                slot.len - SLOW_IR_FCS_SIZE
                            }
                            RxStorage::Dma { .. } => slot.len,
                            RxStorage::Empty => {
                                s.pool.release(index);
                                continue;
                            }
                        };
                        if halting {
                            s.pool.release(index);
                            continue;
                        }
                        s.pool.mark_pending(index);
                        bump(&mut s.stats.packets_received);
                        break Some((index, slot.storage, len));
                    }
                });
                if next.is_some() {
                    q.packets_sent_to_protocol += 1;
                }
                next
            };

            let Some((index, storage, len)) = next else {
                return;
            };
            // SAFETY: the slot is pending; nothing writes its bytes until it
            // comes back through `return_packet`.
            let data: &[u8] = match storage {
                RxStorage::Sir(buf) => unsafe { self.arena.sir_buffer(buf, len) },
                RxStorage::Dma { offset } => unsafe { self.arena.ring_span(Span::new(offset, len)) },
                RxStorage::Empty => &[],
            };
            let token = RxToken(index);
            if self.host.indicate_receive(RxPacket::new(token, data)) != NdisStatus::Pending {
                self.return_packet(token);
            }
        }
    }

    /// Take back a receive buffer the protocol was holding
    ///
    /// A returned FIR lease may be what a starved receive window was waiting
    /// for, so receive restarts here when the channel is free.
    pub fn return_packet(&self, token: RxToken) {
        let released = {
            let mut guard = self.queue.lock();
            let q = &mut *guard;
            let may_restart = q.transmit.is_idle() && !q.halting;
            let returned = self.intr.with(|s| {
                let storage = s.pool.return_pending(token.0)?;
                bump(&mut s.stats.packets_returned);
                if may_restart && !s.speed.is_sir() && !s.fir.rx_active && !s.fir.tx_pending {
                    match self.fir_setup_recv(s) {
                        Ok(()) => self.set_interrupt_mask(s, true),
                        Err(e) => debug!("receive still stalled: {e}"),
                    }
                }
                Some(storage)
            });
            if returned.is_none() {
                return;
            }
            q.packets_sent_to_protocol = q.packets_sent_to_protocol.saturating_sub(1);
            q.halting && q.packets_sent_to_protocol == 0
        };
        if released {
            self.host.set_event(HaltEvent::ReceiveStopped);
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::driver::config::AdapterConfig;
    use crate::framing::build_sir_frame;
    use crate::internal::constants::MAX_IRDA_DATA_SIZE;
    use crate::test_utils::{service, test_adapter};
    use std::vec::Vec;

    fn wire_frame(payload: &[u8]) -> Vec<u8> {
        let mut out = std::vec![0u8; MAX_IRDA_DATA_SIZE];
        let n = build_sir_frame(payload, 0, &mut out).unwrap();
        out.truncate(n);
        out
    }

    #[test]
    fn accepted_frames_are_returned_at_once() {
        let adapter = test_adapter(AdapterConfig::new());
        adapter.initialize().unwrap();
        adapter.port().io().feed_rx(&wire_frame(&[0xFF, 0x3F, 1, 2, 3]));
        service(adapter);

        assert_eq!(adapter.host().received().len(), 1);
        assert_eq!(adapter.pending_receives(), 0);
        assert_eq!(adapter.queue.with(|q| q.packets_sent_to_protocol), 0);
        let stats = adapter.stats();
        assert_eq!(stats.packets_received, 1);
        assert_eq!(stats.packets_returned, 1);
    }

    #[test]
    fn unknown_token_is_ignored() {
        let adapter = test_adapter(AdapterConfig::new());
        adapter.initialize().unwrap();

        adapter.return_packet(RxToken(3));
        assert_eq!(adapter.stats().packets_returned, 0);
        assert!(adapter.intr.with(|s| s.pool.is_conserved()));
    }

    #[test]
    fn last_return_during_halt_signals_receive_stopped() {
        let adapter = test_adapter(AdapterConfig::new());
        adapter.initialize().unwrap();
        adapter.host().set_receive_status(NdisStatus::Pending);
        adapter.port().io().feed_rx(&wire_frame(&[0xFF, 0x3F, 7]));
        service(adapter);
        let token = adapter.host().received()[0].0;

        adapter.queue.with(|q| q.halting = true);
        adapter.return_packet(token);
        assert_eq!(adapter.host().events(), [HaltEvent::ReceiveStopped]);
    }

    #[test]
    fn frames_are_dropped_while_halting() {
        let adapter = test_adapter(AdapterConfig::new());
        adapter.initialize().unwrap();
        adapter.queue.with(|q| q.halting = true);
        adapter.port().io().feed_rx(&wire_frame(&[0xFF, 0x3F, 8]));
        service(adapter);

        assert!(adapter.host().received().is_empty());
        assert!(adapter.intr.with(|s| s.pool.is_conserved() && s.pool.full_count() == 0));
    }
}
