//! Send queue and speed-change coordinator
//!
//! One packet at a time moves `queued -> staged -> sending -> completed`.
//! A staged packet is waiting for its turnaround timer. A speed change
//! requested while a packet is staged or sending is recorded against that
//! packet's ticket and applied by the DPC once it completes, before the
//! next packet starts.

use embedded_hal::delay::DelayNs;
use log::{debug, trace, warn};

use crate::hal::{DmaChannel, PortIo};
use crate::host::{HaltEvent, IrPacket, NdisHost, NdisStatus};

use super::adapter::NscIrda;
use super::state::{QueueState, Queued, SpeedChange, Transmit};

/// Turnaround delay rounded to the host timer's millisecond resolution
///
/// Anything below one millisecond still waits one tick.
pub(crate) fn turnaround_ms(usec: u32) -> u32 {
    if usec < 1000 {
        1
    } else {
        (usec + 500) / 1000
    }
}

impl<B, M, H, D> NscIrda<B, M, H, D>
where
    B: PortIo,
    M: DmaChannel,
    H: NdisHost,
    D: DelayNs,
{
    /// Queue packets for transmission
    ///
    /// Packets are sent in order. While halting they complete immediately
    /// with [`NdisStatus::Failure`]; a full queue completes the overflow with
    /// [`NdisStatus::Resources`].
    pub fn send_packets<I>(&self, packets: I)
    where
        I: IntoIterator<Item = H::Packet>,
    {
        for packet in packets {
            let rejected = {
                let mut guard = self.queue.lock();
                let q = &mut *guard;
                if q.halting {
                    Some((packet, NdisStatus::Failure))
                } else {
                    let queued = q.ticket(packet);
                    q.send_queue
                        .push_back(queued)
                        .err()
                        .map(|q| (q.packet, NdisStatus::Resources))
                }
            };
            if let Some((packet, status)) = rejected {
                debug!("send refused: {status:?}");
                self.host.send_complete(packet, status);
            }
        }
        self.process_send_queue();
    }

    /// Turnaround timer callback: start the staged packet
    pub fn turnaround_timer_expired(&self) {
        let failed = {
            let mut guard = self.queue.lock();
            let q = &mut *guard;
            if !matches!(q.transmit, Transmit::Staged(_)) {
                debug!("turnaround timer with nothing staged");
                return;
            }
            self.send_current_packet(q)
        };
        if let Some(queued) = failed {
            self.host.send_complete(queued.packet, NdisStatus::Failure);
            self.process_send_queue();
        }
    }

    /// Start the next queued packet if nothing is in flight
    ///
    /// With the queue empty the transmit path goes idle, continuous receive
    /// restarts, and a halt waiting on the send is released.
    pub(crate) fn process_send_queue(&self) {
        loop {
            let mut guard = self.queue.lock();
            let q = &mut *guard;
            if !q.initialized || !q.transmit.is_idle() {
                return;
            }

            if let Some(queued) = q.send_queue.pop_front() {
                let turnaround = queued.packet.min_turnaround_usec();
                q.transmit = Transmit::Staged(queued);
                q.transmit_idle = false;

                if turnaround > 0 {
                    drop(guard);
                    trace!("turnaround {turnaround} us");
                    self.host.set_turnaround_timer(turnaround_ms(turnaround));
                    return;
                }
                match self.send_current_packet(q) {
                    Some(failed) => {
                        drop(guard);
                        self.host.send_complete(failed.packet, NdisStatus::Failure);
                        continue;
                    }
                    None => return,
                }
            }

            if q.transmit_idle {
                return;
            }
            q.transmit_idle = true;
            self.intr.with(|s| self.restart_receive(s));
            let halting = q.halting;
            drop(guard);
            if halting {
                self.host.set_event(HaltEvent::SendStopped);
            }
            return;
        }
    }

    /// Hand the staged packet to the engine for the programmed speed
    ///
    /// Returns the packet when it could not be started; the transmit path
    /// is then idle again.
    fn send_current_packet(&self, q: &mut QueueState<H::Packet, D>) -> Option<Queued<H::Packet>> {
        let queued = match core::mem::take(&mut q.transmit) {
            Transmit::Staged(queued) => queued,
            other => {
                q.transmit = other;
                return None;
            }
        };
        let flush = q.speed_change_after(queued.ticket);
        q.hang_check = 0;

        let started = self.intr.with(|s| {
            if s.speed.is_sir() {
                self.sir_start_transmit(s, &queued.packet, flush)
            } else {
                self.fir_start_transmit(s, &queued.packet)
            }
        });

        match started {
            Ok(()) => {
                q.transmit = Transmit::Sending(queued);
                None
            }
            Err(e) => {
                warn!("packet {} not sent: {e}", queued.ticket);
                if flush {
                    q.speed_change = SpeedChange::Stable;
                    if let Err(e) = self.set_speed(q) {
                        warn!("speed change after failed send: {e}");
                    }
                }
                Some(queued)
            }
        }
    }
}
