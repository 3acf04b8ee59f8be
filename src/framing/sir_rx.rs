//! SIR receive framer
//!
//! Byte-at-a-time delimiter/escape state machine run from the SIR interrupt.
//! Raw bytes are pulled from the UART in FIFO-sized chunks; when a frame ends
//! part way through a chunk, the unread tail is kept and replayed into the
//! next frame (the `Cleanup` state).

use log::{error, trace};

use crate::internal::constants::{
    MIN_SIR_FRAME_SIZE, SIR_BOF, SIR_ESC, SIR_ESC_COMPL, SIR_EOF, SIR_RX_MAX_PASSES,
    UART_FIFO_DEPTH,
};

/// Receive framer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// Hunting for a BOF
    #[default]
    Init,
    /// Inside the BOF run
    GotBof,
    /// Collecting frame bytes
    Accepting,
    /// Previous byte was ESC
    EscSequence,
    /// Frame complete, waiting to be taken
    SawEof,
    /// Frame complete with raw bytes already read past its EOF
    Cleanup,
}

/// Framer error counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FramerStats {
    /// Frames aborted by a misplaced delimiter or bad escape
    pub aborted: u32,
    /// Frames shorter than address + control + FCS
    pub runts: u32,
    /// Frames that ran past the receive buffer without an EOF
    pub overflows: u32,
}

/// SIR receive state machine
#[derive(Debug, Clone)]
pub struct SirReceiver {
    state: RxState,
    len: usize,
    tail: [u8; UART_FIFO_DEPTH],
    tail_pos: usize,
    tail_len: usize,
    media_busy: bool,
    stats: FramerStats,
}

impl Default for SirReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl SirReceiver {
    /// Create a framer hunting for a BOF
    pub const fn new() -> Self {
        Self {
            state: RxState::Init,
            len: 0,
            tail: [0; UART_FIFO_DEPTH],
            tail_pos: 0,
            tail_len: 0,
            media_busy: false,
            stats: FramerStats {
                aborted: 0,
                runts: 0,
                overflows: 0,
            },
        }
    }

    /// Current state
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Bytes accumulated for the frame in progress
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no frame bytes are accumulated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Error counters
    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Return and clear the "BOF seen" flag
    pub fn take_media_busy(&mut self) -> bool {
        core::mem::take(&mut self.media_busy)
    }

    /// Drop any partial frame and saved bytes (speed change)
    pub fn reset(&mut self) {
        self.state = RxState::Init;
        self.len = 0;
        self.tail_pos = 0;
        self.tail_len = 0;
    }

    /// Feed raw bytes into `frame` until a frame completes or the UART is dry
    ///
    /// `fill` copies up to `buf.len()` received bytes into `buf` and returns
    /// the count; 0 means the receive FIFO is empty. On `Some(len)` the first
    /// `len` bytes of `frame` hold the un-escaped frame including its FCS, and
    /// the caller must supply a fresh `frame` on the next call.
    pub fn pump<F>(&mut self, frame: &mut [u8], mut fill: F) -> Option<usize>
    where
        F: FnMut(&mut [u8]) -> usize,
    {
        match self.state {
            RxState::SawEof => self.start_over(),
            RxState::Cleanup => {
                self.start_over();
                while self.tail_pos < self.tail_len {
                    let byte = self.tail[self.tail_pos];
                    self.tail_pos += 1;
                    if self.step(frame, byte) {
                        return Some(self.finish());
                    }
                }
                self.tail_len = 0;
                self.tail_pos = 0;
            }
            _ => {}
        }

        let mut raw = [0u8; UART_FIFO_DEPTH];
        for _ in 0..SIR_RX_MAX_PASSES {
            let n = fill(&mut raw).min(raw.len());
            if n == 0 {
                break;
            }
            for (i, &byte) in raw[..n].iter().enumerate() {
                if self.step(frame, byte) {
                    let rest = &raw[i + 1..n];
                    self.tail[..rest.len()].copy_from_slice(rest);
                    self.tail_pos = 0;
                    self.tail_len = rest.len();
                    return Some(self.finish());
                }
            }
        }
        None
    }

    fn start_over(&mut self) {
        self.state = RxState::Init;
        self.len = 0;
    }

    fn finish(&mut self) -> usize {
        self.state = if self.tail_pos < self.tail_len {
            RxState::Cleanup
        } else {
            RxState::SawEof
        };
        trace!("SIR frame complete: {} bytes", self.len);
        self.len
    }

    fn abort(&mut self) {
        self.stats.aborted = self.stats.aborted.wrapping_add(1);
        self.start_over();
    }

    fn append(&mut self, frame: &mut [u8], byte: u8) {
        if self.len >= frame.len() {
            error!("SIR frame overflow after {} bytes, resync", self.len);
            self.stats.overflows = self.stats.overflows.wrapping_add(1);
            self.start_over();
            return;
        }
        frame[self.len] = byte;
        self.len += 1;
    }

    /// Advance by one byte; true when an EOF closed a frame
    fn step(&mut self, frame: &mut [u8], byte: u8) -> bool {
        match self.state {
            RxState::Init | RxState::SawEof | RxState::Cleanup => {
                if byte == SIR_BOF {
                    self.media_busy = true;
                    self.state = RxState::GotBof;
                    self.len = 0;
                }
            }
            RxState::GotBof => match byte {
                SIR_BOF => {}
                SIR_EOF => self.abort(),
                SIR_ESC => self.state = RxState::EscSequence,
                _ => {
                    self.state = RxState::Accepting;
                    self.append(frame, byte);
                }
            },
            RxState::Accepting => match byte {
                SIR_BOF => self.abort(),
                SIR_EOF => {
                    if self.len < MIN_SIR_FRAME_SIZE {
                        self.stats.runts = self.stats.runts.wrapping_add(1);
                        self.start_over();
                    } else {
                        return true;
                    }
                }
                SIR_ESC => self.state = RxState::EscSequence,
                _ => self.append(frame, byte),
            },
            RxState::EscSequence => match byte {
                SIR_BOF | SIR_EOF | SIR_ESC => self.abort(),
                _ => {
                    self.state = RxState::Accepting;
                    self.append(frame, byte ^ SIR_ESC_COMPL);
                }
            },
        }
        false
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::internal::constants::MAX_RCV_DATA_SIZE;
    use std::collections::VecDeque;
    use std::vec::Vec;

    fn source(bytes: &[u8]) -> VecDeque<u8> {
        bytes.iter().copied().collect()
    }

    fn drain_into(fifo: &mut VecDeque<u8>) -> impl FnMut(&mut [u8]) -> usize + '_ {
        move |buf: &mut [u8]| {
            let mut n = 0;
            while n < buf.len() {
                match fifo.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            n
        }
    }

    #[test]
    fn noise_before_bof_is_ignored() {
        let mut rx = SirReceiver::new();
        let mut frame = [0u8; 64];
        let mut fifo = source(&[0x11, 0x22, SIR_EOF]);
        assert_eq!(rx.pump(&mut frame, drain_into(&mut fifo)), None);
        assert_eq!(rx.state(), RxState::Init);
        assert!(!rx.take_media_busy());
    }

    #[test]
    fn simple_frame_completes() {
        let mut rx = SirReceiver::new();
        let mut frame = [0u8; 64];
        let mut fifo = source(&[SIR_BOF, SIR_BOF, 1, 2, 3, 4, SIR_EOF]);
        assert_eq!(rx.pump(&mut frame, drain_into(&mut fifo)), Some(4));
        assert_eq!(&frame[..4], &[1, 2, 3, 4]);
        assert_eq!(rx.state(), RxState::SawEof);
        assert!(rx.take_media_busy());
        assert!(!rx.take_media_busy());
    }

    #[test]
    fn escapes_are_removed() {
        let mut rx = SirReceiver::new();
        let mut frame = [0u8; 64];
        let mut fifo = source(&[SIR_BOF, SIR_ESC, 0xE0, 0x01, SIR_ESC, 0x5D, 0x02, SIR_EOF]);
        assert_eq!(rx.pump(&mut frame, drain_into(&mut fifo)), Some(4));
        assert_eq!(&frame[..4], &[0xC0, 0x01, 0x7D, 0x02]);
    }

    #[test]
    fn eof_right_after_bof_aborts() {
        let mut rx = SirReceiver::new();
        let mut frame = [0u8; 64];
        let mut fifo = source(&[SIR_BOF, SIR_EOF]);
        assert_eq!(rx.pump(&mut frame, drain_into(&mut fifo)), None);
        assert_eq!(rx.state(), RxState::Init);
        assert_eq!(rx.stats().aborted, 1);
    }

    #[test]
    fn bof_inside_frame_resets() {
        let mut rx = SirReceiver::new();
        let mut frame = [0u8; 64];
        let mut fifo = source(&[SIR_BOF, 1, 2, SIR_BOF, 3]);
        assert_eq!(rx.pump(&mut frame, drain_into(&mut fifo)), None);
        assert_eq!(rx.state(), RxState::Init);
        assert_eq!(rx.stats().aborted, 1);
    }

    #[test]
    fn delimiter_after_escape_aborts() {
        for bad in [SIR_BOF, SIR_EOF, SIR_ESC] {
            let mut rx = SirReceiver::new();
            let mut frame = [0u8; 64];
            let mut fifo = source(&[SIR_BOF, 1, SIR_ESC, bad]);
            assert_eq!(rx.pump(&mut frame, drain_into(&mut fifo)), None);
            assert_eq!(rx.state(), RxState::Init, "{bad:#x}");
            assert_eq!(rx.stats().aborted, 1);
        }
    }

    #[test]
    fn short_frame_is_a_runt() {
        let mut rx = SirReceiver::new();
        let mut frame = [0u8; 64];
        let mut fifo = source(&[SIR_BOF, 1, 2, 3, SIR_EOF]);
        assert_eq!(rx.pump(&mut frame, drain_into(&mut fifo)), None);
        assert_eq!(rx.stats().runts, 1);
        assert_eq!(rx.state(), RxState::Init);
    }

    #[test]
    fn partial_frame_survives_between_pumps() {
        let mut rx = SirReceiver::new();
        let mut frame = [0u8; 64];
        let mut fifo = source(&[SIR_BOF, 1, 2]);
        assert_eq!(rx.pump(&mut frame, drain_into(&mut fifo)), None);
        assert_eq!(rx.state(), RxState::Accepting);

        let mut fifo = source(&[3, 4, SIR_EOF]);
        assert_eq!(rx.pump(&mut frame, drain_into(&mut fifo)), Some(4));
        assert_eq!(&frame[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn trailing_bytes_seed_next_frame() {
        let mut rx = SirReceiver::new();
        let mut first = [0u8; 64];
        let mut second = [0u8; 64];
        let mut fifo = source(&[SIR_BOF, 1, 2, 3, 4, SIR_EOF, SIR_BOF, 5, 6, 7, 8, SIR_EOF]);

        assert_eq!(rx.pump(&mut first, drain_into(&mut fifo)), Some(4));
        assert_eq!(rx.state(), RxState::Cleanup);
        assert!(fifo.is_empty());

        // nothing new in the FIFO; the saved tail still yields the next frame
        assert_eq!(rx.pump(&mut second, |_| 0), Some(4));
        assert_eq!(&second[..4], &[5, 6, 7, 8]);
        assert_eq!(rx.state(), RxState::SawEof);
    }

    #[test]
    fn overflow_resets_to_init() {
        let mut rx = SirReceiver::new();
        let mut frame = [0u8; 8];
        let mut fifo = source(&[SIR_BOF, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, SIR_EOF]);
        assert_eq!(rx.pump(&mut frame, drain_into(&mut fifo)), None);
        assert_eq!(rx.stats().overflows, 1);
        assert_eq!(rx.state(), RxState::Init);
    }

    #[test]
    fn max_frame_fits_receive_buffer() {
        let mut rx = SirReceiver::new();
        let mut frame = std::vec![0u8; MAX_RCV_DATA_SIZE];
        let mut wire = Vec::with_capacity(MAX_RCV_DATA_SIZE + 2);
        wire.push(SIR_BOF);
        wire.extend(core::iter::repeat_n(0x55u8, MAX_RCV_DATA_SIZE));
        wire.push(SIR_EOF);

        let mut fifo: VecDeque<u8> = wire.into_iter().collect();
        let mut got = None;
        while got.is_none() && !fifo.is_empty() {
            got = rx.pump(&mut frame, drain_into(&mut fifo));
        }
        assert_eq!(got, Some(MAX_RCV_DATA_SIZE));
        assert_eq!(rx.stats().overflows, 0);
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut rx = SirReceiver::new();
        let mut frame = [0u8; 16];
        let mut fifo = source(&[SIR_BOF, 1, 2]);
        rx.pump(&mut frame, drain_into(&mut fifo));
        rx.reset();
        assert_eq!(rx.state(), RxState::Init);
        assert!(rx.is_empty());
    }
}
