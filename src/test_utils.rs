//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for exercising the engine on
//! the host without an adapter: a register-level model of the controller's
//! port window, a DMA channel, and a recording NDIS host.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::{Cell, RefCell};
use std::boxed::Box;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::vec::Vec;

use crate::driver::{AdapterConfig, NscIrda};
use crate::error::{DmaError, DmaResult};
use crate::hal::{DmaChannel, PortIo};
use crate::host::{HaltEvent, IrPacket, NdisHost, NdisStatus, RxPacket, RxToken};
use crate::internal::register::{
    ascr, bank0, bank2, bank4, bank5, bank7, excr1, fcr, ier, iir, ircfg, ircr1, lsr, BANK_SELECT,
    BSR, BSR_BKSE, NUM_BANKS, REGS_PER_BANK,
};

/// Signature every channel reports until a test picks one
const DEFAULT_SIGNATURE: u8 = 0x0F;

/// Upper bound on ISR/DPC rounds per [`service`] call
const SERVICE_ROUNDS: usize = 256;

// =============================================================================
// Mock Port
// =============================================================================

#[derive(Debug)]
struct PortState {
    regs: [[u8; REGS_PER_BANK as usize]; NUM_BANKS as usize],
    bank: u8,
    bsr: u8,
    rx: VecDeque<u8>,
    rx_fifo_level: u8,
    line_errors: u8,
    thre: bool,
    tx_stuck: bool,
    tx_log: Vec<u8>,
    eir: u8,
    status_fifo: VecDeque<(u8, u16)>,
    auto_timer: bool,
    ier_stuck: Option<u8>,
    signatures: [u8; 2],
}

impl Default for PortState {
    fn default() -> Self {
        Self {
            regs: [[0; REGS_PER_BANK as usize]; NUM_BANKS as usize],
            bank: 0,
            bsr: BANK_SELECT[0],
            rx: VecDeque::new(),
            rx_fifo_level: 0,
            line_errors: 0,
            thre: false,
            tx_stuck: false,
            tx_log: Vec::new(),
            eir: 0,
            status_fifo: VecDeque::new(),
            auto_timer: true,
            ier_stuck: None,
            signatures: [DEFAULT_SIGNATURE; 2],
        }
    }
}

impl PortState {
    fn extended(&self) -> bool {
        self.regs[2][bank2::EXCR1 as usize] & excr1::EXT_SL != 0
    }

    fn ier(&self) -> u8 {
        self.regs[0][bank0::IER as usize]
    }

    /// 16550 interrupt identification, highest priority first
    fn iir_id(&self) -> u8 {
        let enabled = self.ier();
        if enabled & ier::LS != 0 && self.line_errors != 0 {
            iir::LINE_STATUS
        } else if enabled & ier::RXHDL != 0 && !self.rx.is_empty() {
            iir::RX_DATA
        } else if enabled & ier::TXLDL != 0 && self.thre {
            iir::THR_EMPTY
        } else {
            iir::NO_INT
        }
    }

    fn select(&mut self, value: u8) {
        self.bsr = value;
        self.bank = if value & BSR_BKSE == 0 {
            0
        } else {
            BANK_SELECT
                .iter()
                .position(|&v| v == value)
                .map_or(1, |b| b as u8)
        };
    }

    fn read(&mut self, offset: u8) -> u8 {
        if offset == BSR {
            return self.bsr;
        }
        let stored = self.regs[self.bank as usize][offset as usize];
        match (self.bank, offset) {
            (0, bank0::RXD_TXD) => {
                if let Some(byte) = self.rx.pop_front() {
                    byte
                } else {
                    self.rx_fifo_level = self.rx_fifo_level.saturating_sub(1);
                    0
                }
            }
            (0, bank0::IER) => self.ier_stuck.unwrap_or(stored),
            (0, bank0::IIR_FCR) if self.extended() => core::mem::take(&mut self.eir),
            (0, bank0::IIR_FCR) => {
                let id = self.iir_id();
                if id == iir::THR_EMPTY {
                    self.thre = false;
                }
                let fifos = if stored & fcr::ENABLE != 0 {
                    iir::FIFOS_ENABLED
                } else {
                    0
                };
                fifos | id
            }
            (0, bank0::LSR) => {
                let mut status = core::mem::take(&mut self.line_errors);
                if !self.tx_stuck {
                    status |= lsr::TXRDY | lsr::TXEMP;
                }
                if !self.rx.is_empty() {
                    status |= lsr::RXDA;
                }
                status
            }
            (0, bank0::MSR) => 0,
            (2, bank2::RXFLV) => self.rx_fifo_level,
            (2, bank2::TXFLV) => 0,
            (5, bank5::FRM_ST) => self.status_fifo.front().map_or(0, |&(status, _)| status),
            (5, bank5::RFRL_L) => self.status_fifo.front().map_or(0, |&(_, len)| len as u8),
            (5, bank5::RFRL_H) => self
                .status_fifo
                .pop_front()
                .map_or(0, |(_, len)| (len >> 8) as u8),
            (7, bank7::IRCFG1 | bank7::IRCFG2) if stored & ircfg::ID_SENSE != 0 => {
                let channel = usize::from(offset - bank7::IRCFG1);
                (stored & !ircfg::ID_MASK) | self.signatures[channel]
            }
            _ => stored,
        }
    }

    fn write(&mut self, offset: u8, value: u8) {
        if offset == BSR {
            self.select(value);
            return;
        }
        let bank = self.bank as usize;
        match (self.bank, offset) {
            (0, bank0::RXD_TXD) => {
                self.tx_log.push(value);
                self.thre = !self.tx_stuck;
            }
            (0, bank0::IER) => {
                let newly = value & !self.ier();
                if newly & ier::TXLDL != 0 && !self.tx_stuck {
                    self.thre = true;
                }
                self.regs[0][bank0::IER as usize] = value;
            }
            (0, bank0::IIR_FCR) => {
                if value & fcr::RX_RESET != 0 {
                    self.rx.clear();
                    self.rx_fifo_level = 0;
                }
                self.regs[0][bank0::IIR_FCR as usize] = value;
            }
            (0, bank0::ASCR) => self.regs[0][bank0::ASCR as usize] &= !value,
            (4, bank4::IRCR1) => {
                if value & ircr1::TMR_EN == 0 {
                    self.eir &= !ier::TMR;
                } else if self.auto_timer {
                    self.eir |= ier::TMR;
                }
                self.regs[bank][offset as usize] = value;
            }
            _ => self.regs[bank][offset as usize] = value,
        }
    }
}

/// Register-level model of the controller's port window
///
/// Bank switching, the 16550 interrupt identification, the extended-mode
/// event register, the status FIFO, and the transceiver ID pins behave
/// closely enough for the engine to run against it. Test hooks inject
/// received bytes, status FIFO entries and events.
#[derive(Debug, Default)]
pub struct MockPort {
    state: RefCell<PortState>,
}

impl MockPort {
    /// Create a port with every register cleared
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value stored in `reg` of `bank`, without read side effects
    pub fn bank_reg(&self, bank: u8, reg: u8) -> u8 {
        self.state.borrow().regs[bank as usize][reg as usize]
    }

    /// Currently selected bank
    pub fn current_bank(&self) -> u8 {
        self.state.borrow().bank
    }

    /// Bytes written to the transmit holding register so far
    pub fn tx_log(&self) -> Vec<u8> {
        self.state.borrow().tx_log.clone()
    }

    /// Drain the transmit log
    pub fn take_tx_log(&self) -> Vec<u8> {
        core::mem::take(&mut self.state.borrow_mut().tx_log)
    }

    /// ID reported by channel `channel` (0 = A, 1 = B) while sensing
    pub fn set_dongle_signature(&self, channel: usize, signature: u8) {
        self.state.borrow_mut().signatures[channel] = signature & ircfg::ID_MASK;
    }

    /// Bytes arriving at the UART receiver
    pub fn feed_rx(&self, bytes: &[u8]) {
        self.state.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Append a status FIFO entry (frame status, byte count incl. FCS)
    pub fn push_status(&self, status: u8, len: u16) {
        self.state.borrow_mut().status_fifo.push_back((status, len));
    }

    /// Bytes the FIR RX FIFO reports beyond what DMA already moved
    pub fn set_rx_fifo_level(&self, level: u8) {
        self.state.borrow_mut().rx_fifo_level = level;
    }

    /// Latch line status errors; cleared by the next LSR read
    pub fn set_line_errors(&self, bits: u8) {
        self.state.borrow_mut().line_errors = bits;
    }

    /// Hold the transmitter busy: no THR-empty, no TXRDY
    pub fn set_tx_stuck(&self, stuck: bool) {
        let mut state = self.state.borrow_mut();
        state.tx_stuck = stuck;
        if stuck {
            state.thre = false;
        }
    }

    pub fn set_tx_underrun(&self, underrun: bool) {
        let mut state = self.state.borrow_mut();
        let reg = &mut state.regs[0][bank0::ASCR as usize];
        if underrun {
            *reg |= ascr::TXUR;
        } else {
            *reg &= !ascr::TXUR;
        }
    }

    /// Whether enabling the timer raises its event straight away
    pub fn set_auto_timer(&self, enabled: bool) {
        self.state.borrow_mut().auto_timer = enabled;
    }

    /// Make IER read back `value` regardless of writes
    pub fn set_ier_stuck(&self, value: u8) {
        self.state.borrow_mut().ier_stuck = Some(value);
    }

    /// Raise extended-mode events (IER bit layout)
    pub fn raise_eir(&self, bits: u8) {
        self.state.borrow_mut().eir |= bits;
    }

    /// Whether the interrupt line is asserted
    pub fn irq_pending(&self) -> bool {
        let state = self.state.borrow();
        if state.extended() {
            state.eir & state.ier() != 0
        } else {
            state.iir_id() != iir::NO_INT
        }
    }
}

impl PortIo for MockPort {
    fn read(&self, offset: u8) -> u8 {
        self.state.borrow_mut().read(offset)
    }

    fn write(&self, offset: u8, value: u8) {
        self.state.borrow_mut().write(offset, value);
    }
}

// =============================================================================
// Mock DMA Channel
// =============================================================================

#[derive(Debug, Default)]
struct DmaState {
    rx_pending: Vec<u8>,
    rx_window: Option<usize>,
    tx_active: bool,
    transmitted: Vec<Vec<u8>>,
    fail_next: bool,
    starts: usize,
    overlap: bool,
}

impl DmaState {
    fn start(&mut self) -> DmaResult<()> {
        self.starts += 1;
        if core::mem::take(&mut self.fail_next) {
            return Err(DmaError::SetupFailed);
        }
        if self.rx_window.is_some() || self.tx_active {
            self.overlap = true;
        }
        Ok(())
    }
}

/// Host DMA channel double
///
/// Clones share state, so a test can keep a handle while the adapter owns
/// the channel.
#[derive(Debug, Clone, Default)]
pub struct MockDma {
    state: Arc<Mutex<DmaState>>,
}

impl MockDma {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DmaState> {
        self.state.lock().unwrap()
    }

    /// Bytes the device will move into the next receive window
    pub fn feed(&self, bytes: &[u8]) {
        self.state().rx_pending.extend_from_slice(bytes);
    }

    /// Every buffer handed to a transmit transfer, in order
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.state().transmitted.clone()
    }

    /// Fail the next transfer setup
    pub fn fail_next_start(&self) {
        self.state().fail_next = true;
    }

    pub fn start_count(&self) -> usize {
        self.state().starts
    }

    /// A transfer was started while another was still active
    pub fn overlap_detected(&self) -> bool {
        self.state().overlap
    }
}

impl DmaChannel for MockDma {
    fn start_from_device(&mut self, window: &mut [u8]) -> DmaResult<()> {
        let mut state = self.state();
        state.start()?;
        state.rx_window = Some(window.len());
        Ok(())
    }

    fn complete_from_device(&mut self, window: &mut [u8]) -> DmaResult<usize> {
        let mut state = self.state();
        state.rx_window = None;
        let n = state.rx_pending.len().min(window.len());
        window[..n].copy_from_slice(&state.rx_pending[..n]);
        state.rx_pending.drain(..n);
        Ok(n)
    }

    fn start_to_device(&mut self, data: &[u8]) -> DmaResult<()> {
        let mut state = self.state();
        state.start()?;
        state.tx_active = true;
        state.transmitted.push(data.to_vec());
        Ok(())
    }

    fn complete_to_device(&mut self) -> DmaResult<()> {
        self.state().tx_active = false;
        Ok(())
    }

    fn remaining(&self) -> u32 {
        let state = self.state();
        state.rx_window.map_or(0, |len| {
            len.saturating_sub(state.rx_pending.len()) as u32
        })
    }
}

// =============================================================================
// Mock Host
// =============================================================================

/// Outgoing packet with a single fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPacket {
    pub id: u32,
    data: Vec<u8>,
    turnaround_usec: u32,
    extra_bofs: u32,
}

impl TestPacket {
    pub fn new(id: u32, data: &[u8]) -> Self {
        Self {
            id,
            data: data.to_vec(),
            turnaround_usec: 0,
            extra_bofs: 0,
        }
    }

    pub fn with_turnaround(mut self, usec: u32) -> Self {
        self.turnaround_usec = usec;
        self
    }

    pub fn with_extra_bofs(mut self, count: u32) -> Self {
        self.extra_bofs = count;
        self
    }
}

impl IrPacket for TestPacket {
    fn fragments(&self) -> impl Iterator<Item = &[u8]> {
        core::iter::once(self.data.as_slice())
    }

    fn min_turnaround_usec(&self) -> u32 {
        self.turnaround_usec
    }

    fn extra_bofs(&self) -> u32 {
        self.extra_bofs
    }
}

/// NDIS host that records every upcall
///
/// `sleep_ms` runs an optional hook, which [`test_adapter`] uses to service
/// pending interrupts while bring-up waits for the test interrupt.
pub struct MockHost {
    received: RefCell<Vec<(RxToken, Vec<u8>)>>,
    completed: RefCell<Vec<(u32, NdisStatus)>>,
    statuses: RefCell<Vec<NdisStatus>>,
    timer_requests: RefCell<Vec<u32>>,
    cancel_requests: Cell<usize>,
    cancel_result: Cell<bool>,
    events: RefCell<Vec<HaltEvent>>,
    receive_status: Cell<NdisStatus>,
    slept_ms: Cell<u64>,
    sleep_hook: RefCell<Option<Box<dyn Fn()>>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            received: RefCell::default(),
            completed: RefCell::default(),
            statuses: RefCell::default(),
            timer_requests: RefCell::default(),
            cancel_requests: Cell::new(0),
            cancel_result: Cell::new(true),
            events: RefCell::default(),
            receive_status: Cell::new(NdisStatus::Success),
            slept_ms: Cell::new(0),
            sleep_hook: RefCell::new(None),
        }
    }
}

impl core::fmt::Debug for MockHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockHost")
            .field("received", &self.received.borrow().len())
            .field("completed", &self.completed.borrow())
            .finish_non_exhaustive()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indicated frames with their tokens
    pub fn received(&self) -> Vec<(RxToken, Vec<u8>)> {
        self.received.borrow().clone()
    }

    /// Completed sends as (packet id, status)
    pub fn completed(&self) -> Vec<(u32, NdisStatus)> {
        self.completed.borrow().clone()
    }

    pub fn statuses(&self) -> Vec<NdisStatus> {
        self.statuses.borrow().clone()
    }

    /// Turnaround timer requests in milliseconds
    pub fn timer_requests(&self) -> Vec<u32> {
        self.timer_requests.borrow().clone()
    }

    pub fn cancel_requests(&self) -> usize {
        self.cancel_requests.get()
    }

    pub fn events(&self) -> Vec<HaltEvent> {
        self.events.borrow().clone()
    }

    pub fn slept_ms(&self) -> u64 {
        self.slept_ms.get()
    }

    /// What `indicate_receive` answers
    pub fn set_receive_status(&self, status: NdisStatus) {
        self.receive_status.set(status);
    }

    /// Whether cancelling the turnaround timer finds it still queued
    pub fn set_cancel_result(&self, cancelled: bool) {
        self.cancel_result.set(cancelled);
    }

    pub fn set_sleep_hook(&self, hook: impl Fn() + 'static) {
        *self.sleep_hook.borrow_mut() = Some(Box::new(hook));
    }
}

impl NdisHost for MockHost {
    type Packet = TestPacket;

    fn indicate_receive(&self, packet: RxPacket<'_>) -> NdisStatus {
        self.received
            .borrow_mut()
            .push((packet.token, packet.data.to_vec()));
        self.receive_status.get()
    }

    fn send_complete(&self, packet: TestPacket, status: NdisStatus) {
        self.completed.borrow_mut().push((packet.id, status));
    }

    fn indicate_status(&self, status: NdisStatus) {
        self.statuses.borrow_mut().push(status);
    }

    fn set_turnaround_timer(&self, ms: u32) {
        self.timer_requests.borrow_mut().push(ms);
    }

    fn cancel_turnaround_timer(&self) -> bool {
        self.cancel_requests.set(self.cancel_requests.get() + 1);
        self.cancel_result.get()
    }

    fn sleep_ms(&self, ms: u32) {
        self.slept_ms.set(self.slept_ms.get() + u64::from(ms));
        if let Some(hook) = self.sleep_hook.borrow().as_ref() {
            hook();
        }
    }

    fn wait_event(&self, event: HaltEvent, _timeout_ms: u32) -> bool {
        self.events.borrow().contains(&event)
    }

    fn set_event(&self, event: HaltEvent) {
        self.events.borrow_mut().push(event);
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records delays for verification without actually waiting.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Total nanoseconds delayed
    total_ns: RefCell<u64>,
}

impl MockDelay {
    /// Create a new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        *self.total_ns.borrow()
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.borrow_mut() += u64::from(ns);
    }
}

// =============================================================================
// Adapter Harness
// =============================================================================

pub type TestAdapter = &'static NscIrda<MockPort, MockDma, MockHost, MockDelay>;

/// Leak an adapter over fresh mocks
///
/// Host sleeps service the interrupt line, standing in for the interrupt
/// that would preempt a sleeping thread.
pub fn test_adapter(config: AdapterConfig) -> TestAdapter {
    let adapter: TestAdapter = Box::leak(Box::new(NscIrda::new(
        MockPort::new(),
        MockDma::new(),
        MockHost::new(),
        MockDelay::new(),
        config,
    )));
    adapter.host().set_sleep_hook(move || service(adapter));
    adapter
}

/// Run the ISR, and the DPC it asks for, while the interrupt line is up
pub fn service(adapter: TestAdapter) {
    for _ in 0..SERVICE_ROUNDS {
        if !adapter.port().io().irq_pending() {
            return;
        }
        let outcome = adapter.isr();
        if !outcome.recognized {
            return;
        }
        if outcome.queue_deferred {
            adapter.handle_interrupt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::BankedPort;

    #[test]
    fn bank_select_round_trips() {
        let port = BankedPort::new(MockPort::new());
        port.write_bank_reg(2, bank2::BGDL, 12);
        assert_eq!(port.io().bank_reg(2, bank2::BGDL), 12);
        assert_eq!(port.io().bank_reg(0, bank2::BGDL), 0);
        assert_eq!(port.io().current_bank(), 0);
    }

    #[test]
    fn status_fifo_pops_on_high_length_byte() {
        let port = BankedPort::new(MockPort::new());
        port.io().push_status(0x80, 0x0123);
        assert_eq!(port.read_bank_reg(5, bank5::FRM_ST), 0x80);
        assert_eq!(port.read_bank_reg(5, bank5::RFRL_L), 0x23);
        assert_eq!(port.read_bank_reg(5, bank5::RFRL_H), 0x01);
        assert_eq!(port.read_bank_reg(5, bank5::FRM_ST), 0);
    }

    #[test]
    fn thr_empty_fires_once_per_enable() {
        let port = MockPort::new();
        port.write(bank0::IER, ier::TXLDL);
        assert!(port.irq_pending());
        assert_eq!(port.read(bank0::IIR_FCR) & iir::ID_MASK, iir::THR_EMPTY);
        assert!(!port.irq_pending());
    }
}
