//! NSC IrDA adapter
//!
//! [`NscIrda`] ties the banked port, the shared DMA channel and the host
//! upcalls together. The implementation is split by concern:
//!
//! - this file: construction, bring-up, halt, reset, speed programming, ISR
//!   dispatch and the deferred callback
//! - `sir`: UART byte engine (ISR side)
//! - `fir`: DMA frame engine
//! - `send`: send queue and speed-change coordinator
//! - `delivery`: receive indication and buffer return
//! - `oid`: query/set information

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::dongle::{DongleCaps, DongleChannel, IrMode};
use crate::error::{ConfigError, ConfigResult, DongleResult, Result};
use crate::hal::{BankedPort, DmaChannel, DmaUtil, PortIo};
use crate::host::{HaltEvent, NdisHost, NdisStatus};
use crate::internal::constants::{
    HALT_WAIT_TIMEOUT_MS, MAX_DMA_FRAME_SIZE, TEST_INTERRUPT_WAIT_MS, VERIFY_HARDWARE_ATTEMPTS,
    VERIFY_HARDWARE_SETTLE_MS,
};
use crate::internal::register::{
    bank0, bank2, bank4, excr1, fcr, ier, iir, ircr1, mcr, BANK_SELECT,
};
use crate::sync::{InterruptLock, QueueLock};

use super::arena::RxArena;
use super::config::{AdapterConfig, HardwareStatus};
use super::interrupt::IsrOutcome;
use super::speed::BaudRate;
use super::state::{IsrState, QueueState, RegStats, SpeedChange, Transmit};

/// Outcome of [`NscIrda::reset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetStatus {
    /// Reset result
    pub status: NdisStatus,
    /// The protocol must re-apply its addressing (always true for IrDA)
    pub addressing_reset: bool,
}

/// IrDA miniport engine for the NSC PC87108/87308/87338 controllers
///
/// # Type Parameters
///
/// - `B`: raw port window ([`PortIo`])
/// - `M`: host DMA channel ([`DmaChannel`])
/// - `H`: NDIS host upcalls ([`NdisHost`])
/// - `D`: busy-wait delay ([`DelayNs`])
///
/// # Contexts
///
/// [`isr`](Self::isr) runs at interrupt level and only touches
/// interrupt-synchronized state. [`handle_interrupt`](Self::handle_interrupt)
/// is the deferred callback. Everything else is called from thread level by
/// the protocol stack.
pub struct NscIrda<B, M, H: NdisHost, D> {
    pub(super) port: BankedPort<B>,
    pub(super) host: H,
    pub(super) config: AdapterConfig,
    pub(super) intr: InterruptLock<IsrState<M>>,
    pub(super) queue: QueueLock<QueueState<H::Packet, D>>,
    pub(super) arena: RxArena,
}

impl<B, M, H, D> NscIrda<B, M, H, D>
where
    B: PortIo,
    M: DmaChannel,
    H: NdisHost,
    D: DelayNs,
{
    /// Create an adapter over its port window and DMA channel
    ///
    /// Nothing touches the hardware until [`initialize`](Self::initialize).
    pub fn new(io: B, dma: M, host: H, delay: D, config: AdapterConfig) -> Self {
        Self {
            port: BankedPort::new(io),
            host,
            config,
            intr: InterruptLock::new(IsrState::new(DmaUtil::new(dma))),
            queue: QueueLock::new(QueueState::new(config.dongle_types, delay, 0)),
            arena: RxArena::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Banked register file
    pub fn port(&self) -> &BankedPort<B> {
        &self.port
    }

    /// Host upcalls
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Configuration supplied at construction
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Error and traffic counters
    pub fn stats(&self) -> RegStats {
        self.intr.with(|s| s.snapshot_stats())
    }

    /// Speed the hardware is currently programmed for
    pub fn current_speed(&self) -> BaudRate {
        self.intr.with(|s| s.speed)
    }

    /// Speed last requested through `OID_IRDA_LINK_SPEED` or reset
    pub fn link_speed(&self) -> BaudRate {
        self.queue.with(|q| q.link_speed)
    }

    /// Hardware status as reported to the protocol
    pub fn hardware_status(&self) -> HardwareStatus {
        self.queue.with(|q| q.hardware_status)
    }

    /// Receive slots currently held by the protocol
    pub fn pending_receives(&self) -> usize {
        self.intr.with(|s| s.pool.pending_count())
    }

    // =========================================================================
    // Bring-up
    // =========================================================================

    /// Verify the chip, probe the transceivers and start receiving at 9600 bps
    ///
    /// # Errors
    ///
    /// - [`ConfigError::AlreadyInitialized`] on a second call
    /// - [`ConfigError::HardwareNotFound`] when the UART does not respond
    /// - [`ConfigError::InterruptTestFailed`] when the interrupt line is dead
    pub fn initialize(&self) -> Result<()> {
        if self.queue.with(|q| q.initialized) {
            return Err(ConfigError::AlreadyInitialized.into());
        }
        info!(
            "initializing {:?}, dongles {:?}",
            self.config.board, self.config.dongle_types
        );

        self.host.sleep_ms(VERIFY_HARDWARE_SETTLE_MS);
        self.port.sync_write_bank_reg(2, bank2::EXCR1, excr1::NON_EXTENDED);
        self.port.write(bank0::LCR_BSR, BANK_SELECT[0]);
        self.port.write(bank0::IER, 0);

        let mut verified = Err(ConfigError::HardwareNotFound);
        for attempt in 1..=VERIFY_HARDWARE_ATTEMPTS {
            verified = self.verify_hardware();
            match verified {
                Ok(()) => break,
                Err(e) => warn!("hardware verification attempt {attempt} failed: {e}"),
            }
        }
        if let Err(e) = verified {
            error!("adapter not usable: {e}");
            self.intr.with(|s| self.set_interrupt_mask(s, false));
            self.queue.with(|q| q.hardware_status = HardwareStatus::NotReady);
            return Err(e.into());
        }

        {
            let mut guard = self.queue.lock();
            let q = &mut *guard;
            let caps_a = q
                .dongles
                .get_capabilities(&self.port, DongleChannel::A, &mut q.delay)
                .unwrap_or_else(|e| {
                    warn!("dongle A probe failed ({e}), assuming SIR only");
                    DongleCaps::sir_only()
                });
            if let Err(e) = q
                .dongles
                .get_capabilities(&self.port, DongleChannel::B, &mut q.delay)
            {
                debug!("dongle B probe: {e}");
            }
            q.supported_speeds = self.config.allowed_speed_mask() & caps_a.modes.ndis_speed_mask();
            debug!("supported speeds {:#05x}", q.supported_speeds);

            q.link_speed = BaudRate::B9600;
            if let Err(e) = self.set_speed(q) {
                warn!("dongle did not take 9600 bps ({e}), programming the UART anyway");
                self.intr.with(|s| {
                    self.program_speed(s, BaudRate::B9600);
                    self.restart_receive(s);
                });
            }
            q.transmit_idle = false;
            q.initialized = true;
            q.hardware_status = HardwareStatus::Ready;
        }

        self.process_send_queue();
        info!("adapter ready at {}", BaudRate::B9600);
        Ok(())
    }

    fn verify_hardware(&self) -> ConfigResult<()> {
        self.port.write(bank0::IER, 0);
        if self.port.read(bank0::IER) != 0 {
            return Err(ConfigError::HardwareNotFound);
        }

        self.port.write(bank0::IIR_FCR, fcr::RESET_AND_ENABLE);
        let fifo_present =
            self.port.read(bank0::IIR_FCR) & iir::FIFOS_ENABLED == iir::FIFOS_ENABLED;
        self.port.write(bank0::MCR, mcr::MODEM_LINES);

        self.intr.with(|s| {
            s.fifo_present = fifo_present;
            s.got_test_interrupt = false;
            s.testing_interrupt = true;
            self.port.write(bank0::IER, ier::TXLDL);
        });

        let mut fired = false;
        for _ in 0..TEST_INTERRUPT_WAIT_MS {
            self.host.sleep_ms(1);
            if self.intr.with(|s| s.got_test_interrupt) {
                fired = true;
                break;
            }
        }

        self.intr.with(|s| {
            s.testing_interrupt = false;
            self.port.write(bank0::IER, 0);
        });
        if fired {
            debug!("interrupt test passed, FIFOs {}", if fifo_present { "on" } else { "off" });
            Ok(())
        } else {
            Err(ConfigError::InterruptTestFailed)
        }
    }

    // =========================================================================
    // Halt / Reset / Hang Check
    // =========================================================================

    /// Stop the adapter
    ///
    /// Queued and staged packets fail with [`NdisStatus::Failure`]. Halt then
    /// waits for the protocol to return every indicated receive and for an
    /// in-flight send to complete, giving up after 60 s each.
    pub fn halt(&self) {
        info!("halting");
        self.queue.with(|q| {
            q.hardware_status = HardwareStatus::Closing;
            q.halting = true;
        });

        while let Some(queued) = self.queue.with(|q| q.send_queue.pop_front()) {
            self.host.send_complete(queued.packet, NdisStatus::Failure);
        }

        let staged = self
            .queue
            .with(|q| matches!(q.transmit, Transmit::Staged(_)));
        if staged && self.host.cancel_turnaround_timer() {
            let taken = self.queue.with(|q| match core::mem::take(&mut q.transmit) {
                Transmit::Staged(p) => Some(p),
                other => {
                    q.transmit = other;
                    None
                }
            });
            if let Some(p) = taken {
                self.host.send_complete(p.packet, NdisStatus::Failure);
            }
            self.process_send_queue();
        }

        let (outstanding, idle) = self
            .queue
            .with(|q| (q.packets_sent_to_protocol, q.transmit_idle || !q.initialized));
        if outstanding > 0 && !self.host.wait_event(HaltEvent::ReceiveStopped, HALT_WAIT_TIMEOUT_MS) {
            warn!("halt: {outstanding} receive packets never returned");
        }
        if !idle && !self.host.wait_event(HaltEvent::SendStopped, HALT_WAIT_TIMEOUT_MS) {
            warn!("halt: send did not complete");
        }

        let mut guard = self.queue.lock();
        let q = &mut *guard;
        self.intr.with(|s| {
            self.fir_stop_receive(s);
            if s.fir.tx_pending {
                s.fir.tx_pending = false;
                if let Err(e) = s.fir.dma.complete_transfer_to_device() {
                    debug!("halt: transmit DMA teardown: {e}");
                }
            }
            self.program_speed(s, BaudRate::B9600);
        });
        if let Err(e) = q
            .dongles
            .set_req_mode(&self.port, DongleChannel::A, IrMode::LowPower, &mut q.delay)
        {
            debug!("halt: dongle low power: {e}");
        }
        self.intr.with(|s| self.set_interrupt_mask(s, false));
        q.initialized = false;
        info!("halted");
    }

    /// Reset the adapter
    ///
    /// Queued packets fail with [`NdisStatus::ResetInProgress`]. The link
    /// returns to 9600 bps now, or after the packet in flight; the hardware
    /// status stays [`HardwareStatus::Reset`] until that speed is applied.
    pub fn reset(&self) -> ResetStatus {
        warn!("reset requested");
        let (mut drained, set_now) = {
            let mut guard = self.queue.lock();
            let q = &mut *guard;
            q.hardware_status = HardwareStatus::Reset;
            let drained = core::mem::take(&mut q.send_queue);
            q.link_speed = BaudRate::B9600;
            let set_now = match q.transmit.current_ticket() {
                Some(ticket) => {
                    q.speed_change = SpeedChange::AfterPacket(ticket);
                    false
                }
                None => {
                    q.speed_change = SpeedChange::Stable;
                    if let Err(e) = self.set_speed(q) {
                        warn!("reset: speed change failed: {e}");
                    }
                    q.transmit_idle = false;
                    true
                }
            };
            (drained, set_now)
        };

        while let Some(queued) = drained.pop_front() {
            self.host.send_complete(queued.packet, NdisStatus::ResetInProgress);
        }
        if set_now {
            self.process_send_queue();
        }
        ResetStatus {
            status: NdisStatus::Success,
            addressing_reset: true,
        }
    }

    /// Periodic hang check
    ///
    /// A FIR transmit still pending on the second consecutive check gets its
    /// FIFOs reset and the timer interrupt armed so the DPC completes it.
    /// Never requests a reset.
    pub fn check_for_hang(&self) -> bool {
        let mut guard = self.queue.lock();
        let q = &mut *guard;
        self.intr.with(|s| {
            if !s.fir.tx_pending {
                return;
            }
            if q.hang_check > 0 {
                error!("FIR transmit stalled, kicking the timer interrupt");
                self.port.write(bank0::IIR_FCR, fcr::SOFT_RESET);
                s.fir.int_mask = ier::FIR_TIMER_MODE;
                self.port.write_bank_reg(4, bank4::IRCR1, ircr1::TMR_EN);
                self.set_interrupt_mask(s, true);
            }
            q.hang_check = q.hang_check.wrapping_add(1);
        });
        false
    }

    // =========================================================================
    // Speed
    // =========================================================================

    /// Apply `q.link_speed` to the transceiver and the controller
    ///
    /// On a dongle failure the requested speed is reverted and receive
    /// restarts at the speed still programmed. Either way a pending reset
    /// is finished.
    pub(super) fn set_speed(&self, q: &mut QueueState<H::Packet, D>) -> DongleResult<()> {
        let result = self.apply_link_speed(q);
        if q.hardware_status == HardwareStatus::Reset {
            q.hardware_status = HardwareStatus::Ready;
        }
        result
    }

    fn apply_link_speed(&self, q: &mut QueueState<H::Packet, D>) -> DongleResult<()> {
        let target = q.link_speed;
        let previous = self.intr.with(|s| {
            self.fir_stop_receive(s);
            s.speed
        });

        if let Err(e) =
            q.dongles
                .set_capabilities(&self.port, DongleChannel::A, target.ir_mode(), &mut q.delay)
        {
            warn!("dongle rejected {target}: {e}");
            q.link_speed = previous;
            self.intr.with(|s| self.restart_receive(s));
            return Err(e);
        }

        self.intr.with(|s| {
            self.program_speed(s, target);
            self.restart_receive(s);
        });
        info!("link speed {target}");
        Ok(())
    }

    /// Program the UART or the FIR/MIR engine for `target`
    ///
    /// Leaves interrupts masked.
    pub(super) fn program_speed(&self, s: &mut IsrState<M>, target: BaudRate) {
        s.sir_rx.reset();
        s.sir_tx.clear();
        s.sir_write_pending = false;
        s.sir_tx_done = false;
        s.fir.int_mask = 0;
        self.port.write(bank0::IER, 0);

        self.port.write_bank_reg(2, bank2::EXCR1, excr1::RX_DMA);
        if let Some(divisor) = target.uart_divisor() {
            let [lo, hi] = divisor.to_le_bytes();
            self.port.write(bank0::MCR, mcr::MODE_SIR);
            self.port.write_bank_reg(2, bank2::BGDL, lo);
            self.port.write_bank_reg(2, bank2::BGDH, hi);
            self.port.write_bank_reg(2, bank2::EXCR1, excr1::NON_EXTENDED);
            self.port.write(bank0::MCR, mcr::MODEM_LINES);
            self.port.write(bank0::IIR_FCR, fcr::RESET_AND_ENABLE);
        } else {
            let [lo, hi] = (MAX_DMA_FRAME_SIZE as u16).to_le_bytes();
            self.port.write(bank0::MCR, target.mcr_mode() | mcr::DMA_EN);
            self.port.write(bank0::IIR_FCR, fcr::RESET_AND_ENABLE);
            self.port.write_bank_reg(4, bank4::RFRML_L, lo);
            self.port.write_bank_reg(4, bank4::RFRML_H, hi);
        }
        s.speed = target;
    }

    /// Write the interrupt enables for the current mode, or mask everything
    pub(super) fn set_interrupt_mask(&self, s: &IsrState<M>, enable: bool) {
        let mask = if !enable {
            0
        } else if s.speed.is_sir() {
            if s.sir_write_pending {
                ier::SIR_XMIT_MODE
            } else {
                ier::SIR_RCV_MODE
            }
        } else {
            s.fir.int_mask
        };
        self.port.write(bank0::IER, mask);
    }

    /// Resume continuous receive at the programmed speed
    pub(super) fn restart_receive(&self, s: &mut IsrState<M>) {
        if !s.speed.is_sir() && !s.fir.rx_active && !s.fir.tx_pending {
            if let Err(e) = self.fir_setup_recv(s) {
                debug!("receive not restarted: {e}");
            }
        }
        self.set_interrupt_mask(s, true);
    }

    // =========================================================================
    // Interrupts
    // =========================================================================

    /// Interrupt service routine
    ///
    /// Masks the adapter whenever it asks for the deferred callback; the
    /// callback re-enables it.
    pub fn isr(&self) -> IsrOutcome {
        self.intr.with(|s| {
            if s.testing_interrupt {
                return self.test_isr(s);
            }
            let outcome = if s.speed.is_sir() {
                self.sir_isr(s)
            } else {
                self.fir_isr(s)
            };
            if outcome.queue_deferred {
                self.port.write(bank0::IER, 0);
            }
            outcome
        })
    }

    fn test_isr(&self, s: &mut IsrState<M>) -> IsrOutcome {
        if self.port.read(bank0::IIR_FCR) & iir::NO_INT != 0 {
            return IsrOutcome::NOT_OURS;
        }
        s.got_test_interrupt = true;
        s.testing_interrupt = false;
        self.port.write(bank0::IER, 0);
        IsrOutcome::claimed(false)
    }

    /// Deferred interrupt callback
    ///
    /// Completes the finished send, delivers received frames, applies a
    /// speed change waiting on the completed packet, and re-enables
    /// interrupts.
    pub fn handle_interrupt(&self) {
        let indicate_busy = self.intr.with(|s| {
            if s.media_busy && !s.have_indicated_media_busy {
                s.have_indicated_media_busy = true;
                true
            } else {
                false
            }
        });
        if indicate_busy {
            debug!("media busy");
            self.host.indicate_status(NdisStatus::MediaBusy);
        }

        let done = {
            let mut guard = self.queue.lock();
            let q = &mut *guard;
            let status = self.intr.with(|s| {
                if s.speed.is_sir() {
                    if core::mem::take(&mut s.sir_tx_done) {
                        super::state::bump(&mut s.stats.packets_sent);
                        Some(NdisStatus::Success)
                    } else {
                        None
                    }
                } else {
                    s.fir.int_mask = 0;
                    if s.fir.tx_pending {
                        Some(self.fir_complete_transmit(s))
                    } else if s.fir.rx_active || s.fir.rx_ready {
                        self.fir_deliver_frames(s);
                        None
                    } else {
                        debug!("FIR deferred callback with no transfer active");
                        None
                    }
                }
            });

            let done = status.and_then(|status| match core::mem::take(&mut q.transmit) {
                Transmit::Sending(p) => Some((p, status)),
                other => {
                    warn!("send completion with no packet in flight");
                    q.transmit = other;
                    None
                }
            });
            if let Some((p, _)) = &done {
                if q.speed_change_after(p.ticket) {
                    q.speed_change = SpeedChange::Stable;
                    if let Err(e) = self.set_speed(q) {
                        warn!("deferred speed change failed: {e}");
                    }
                }
            }
            done
        };

        if let Some((p, status)) = done {
            self.process_send_queue();
            self.host.send_complete(p.packet, status);
        }

        self.deliver_full_buffers();
        self.intr.with(|s| self.set_interrupt_mask(s, true));
    }
}
