//! SIR byte engine
//!
//! Runs inside the interrupt lock. Receive pulls UART bytes through the
//! framer into the pool's read buffer; transmit feeds the pre-built frame
//! one FIFO burst per THR-empty interrupt.

use embedded_hal::delay::DelayNs;
use log::{trace, warn};

use crate::error::Result;
use crate::framing::convert::ndis_to_ir_packet;
use crate::framing::sir_tx::poll_limit_for;
use crate::framing::TxStep;
use crate::hal::{BankedPort, DmaChannel, PortIo};
use crate::host::{IrPacket, NdisHost};
use crate::internal::constants::{
    MAX_EXTRA_SIR_BOFS, NUM_RCV_BUFS, SIR_ISR_MAX_PASSES, SIR_RX_MAX_PASSES, UART_FIFO_DEPTH,
};
use crate::internal::register::{bank0, ier, lsr};

use super::adapter::NscIrda;
use super::interrupt::{IsrOutcome, SirCause};
use super::state::{bump, IsrState, RegStats};

/// Copy received bytes out of the UART while data is available
fn read_rx_fifo<B: PortIo>(port: &BankedPort<B>, stats: &mut RegStats, raw: &mut [u8]) -> usize {
    let mut n = 0;
    while n < raw.len() {
        let status = port.read(bank0::LSR);
        count_line_errors(stats, status);
        if status & lsr::RXDA == 0 {
            break;
        }
        raw[n] = port.read(bank0::RXD_TXD);
        n += 1;
    }
    n
}

fn count_line_errors(stats: &mut RegStats, status: u8) {
    if status & lsr::OE != 0 {
        bump(&mut stats.sir_overruns);
    }
    if status & (lsr::PE | lsr::FE | lsr::BRK) != 0 {
        bump(&mut stats.sir_line_errors);
    }
}

impl<B, M, H, D> NscIrda<B, M, H, D>
where
    B: PortIo,
    M: DmaChannel,
    H: NdisHost,
    D: DelayNs,
{
    pub(super) fn sir_isr(&self, s: &mut IsrState<M>) -> IsrOutcome {
        let mut recognized = false;
        let mut deferred = false;

        for _ in 0..SIR_ISR_MAX_PASSES {
            let Some(cause) = SirCause::from_iir(self.port.read(bank0::IIR_FCR)) else {
                break;
            };
            recognized = true;
            match cause {
                SirCause::LineStatus => {
                    let status = self.port.read(bank0::LSR);
                    count_line_errors(&mut s.stats, status);
                }
                SirCause::RxData | SirCause::CharTimeout => deferred |= self.sir_receive(s),
                SirCause::ThrEmpty => deferred |= self.sir_transmit_step(s),
                SirCause::ModemStatus => {
                    let _ = self.port.read(bank0::MSR);
                }
            }
        }

        IsrOutcome {
            recognized,
            queue_deferred: deferred,
        }
    }

    /// Pump the framer; true when the DPC has work (a frame or media busy)
    fn sir_receive(&self, s: &mut IsrState<M>) -> bool {
        let mut queued = false;

        for _ in 0..=NUM_RCV_BUFS {
            let Some(buf) = s.pool.read_buffer() else {
                self.sir_drain_rx_fifo(s);
                break;
            };
            // SAFETY: the read buffer belongs to the framer until
            // `complete_sir_frame` attaches it to a slot.
            let frame = unsafe { self.arena.sir_buffer_mut(buf) };
            let stats = &mut s.stats;
            let Some(len) = s
                .sir_rx
                .pump(frame, |raw| read_rx_fifo(&self.port, stats, raw))
            else {
                break;
            };

            if s.pool.complete_sir_frame(len) {
                trace!("SIR frame of {len} bytes queued");
                queued = true;
            } else {
                warn!("no free receive slot, SIR frame of {len} bytes dropped");
                bump(&mut s.stats.rx_no_slot);
            }
        }

        if s.sir_rx.take_media_busy() {
            s.media_busy = true;
        }
        queued || (s.media_busy && !s.have_indicated_media_busy)
    }

    fn sir_drain_rx_fifo(&self, s: &mut IsrState<M>) {
        let mut raw = [0u8; UART_FIFO_DEPTH];
        for _ in 0..SIR_RX_MAX_PASSES {
            if read_rx_fifo(&self.port, &mut s.stats, &mut raw) == 0 {
                break;
            }
        }
    }

    /// One THR-empty burst; true when the packet has gone out
    fn sir_transmit_step(&self, s: &mut IsrState<M>) -> bool {
        if !s.sir_write_pending {
            return false;
        }
        let burst = if s.fifo_present { UART_FIFO_DEPTH } else { 1 };
        let limit = poll_limit_for(s.speed.bits_per_sec());
        match s.sir_tx.step(&self.port, burst, limit) {
            TxStep::MoreToSend => false,
            TxStep::Done => {
                s.sir_write_pending = false;
                s.sir_tx_done = true;
                self.port.write(bank0::IER, ier::SIR_RCV_MODE);
                true
            }
        }
    }

    /// Frame `packet` and hand it to the THR-empty interrupt
    ///
    /// With `flush` set the shift register is drained after the last byte,
    /// ahead of a speed change.
    pub(super) fn sir_start_transmit(
        &self,
        s: &mut IsrState<M>,
        packet: &H::Packet,
        flush: bool,
    ) -> Result<()> {
        let extra_bofs = usize::try_from(packet.extra_bofs()).unwrap_or(MAX_EXTRA_SIR_BOFS);
        let len = ndis_to_ir_packet(packet.fragments(), extra_bofs, s.sir_tx.buffer_mut())?;
        s.sir_tx.load(len, flush);
        s.sir_write_pending = true;
        s.sir_tx_done = false;
        trace!("SIR transmit of {len} wire bytes");
        self.port.write(bank0::IER, ier::SIR_XMIT_MODE);
        Ok(())
    }
}
