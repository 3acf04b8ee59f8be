//! NSC PC87108/87308/87338 Register Definitions
//!
//! The controller exposes eight register banks through an eight-byte I/O
//! window. Offset 3 (LCR/BSR) selects the bank; bank 0 is the 16550-compatible
//! UART view the ISR relies on.
//!
//! # Module Organization
//!
//! - [`bank0`]: UART / extended-mode interrupt and line registers
//! - [`bank2`]: baud generator, extended control, FIFO levels
//! - [`bank4`]: hardware timer, IR control, frame lengths
//! - [`bank5`]: status FIFO
//! - [`bank7`]: infrared transceiver configuration
//! - Bit modules: [`ier`], [`iir`], [`fcr`], [`lsr`], [`mcr`], [`ascr`],
//!   [`excr1`], [`ircr1`], [`frm_st`], [`ircfg`]

#![allow(dead_code)]

/// Number of register banks
pub const NUM_BANKS: u8 = 8;

/// Registers per bank
pub const REGS_PER_BANK: u8 = 8;

/// Bank select register offset (shared by all banks)
pub const BSR: u8 = 3;

/// Value written to BSR to select each bank
///
/// Bank 0 is selected by writing a normal LCR value (8N1) with BKSE clear.
pub const BANK_SELECT: [u8; NUM_BANKS as usize] = [0x03, 0x80, 0xE0, 0xE4, 0xE8, 0xEC, 0xF0, 0xF4];

/// Bank select enable: set whenever a non-zero bank is selected
pub const BSR_BKSE: u8 = 0x80;

/// Bank 0 register offsets
pub mod bank0 {
    /// Receive/transmit data
    pub const RXD_TXD: u8 = 0;
    /// Interrupt enable
    pub const IER: u8 = 1;
    /// Interrupt identification (read, EIR in extended mode) / FIFO control (write)
    pub const IIR_FCR: u8 = 2;
    /// Line control / bank select
    pub const LCR_BSR: u8 = 3;
    /// Modem control
    pub const MCR: u8 = 4;
    /// Line status
    pub const LSR: u8 = 5;
    /// Modem status
    pub const MSR: u8 = 6;
    /// Auxiliary status and control
    pub const ASCR: u8 = 7;
}

/// Bank 2 register offsets
pub mod bank2 {
    /// Baud generator divisor low
    pub const BGDL: u8 = 0;
    /// Baud generator divisor high
    pub const BGDH: u8 = 1;
    /// Extended control 1
    pub const EXCR1: u8 = 2;
    /// Extended control 2
    pub const EXCR2: u8 = 4;
    /// TX FIFO level
    pub const TXFLV: u8 = 6;
    /// RX FIFO level
    pub const RXFLV: u8 = 7;
    /// Mask for the FIFO level registers
    pub const FIFO_LEVEL_MASK: u8 = 0x3F;
}

/// Bank 4 register offsets
pub mod bank4 {
    /// Timer reload low
    pub const TMRL: u8 = 0;
    /// Timer reload high
    pub const TMRH: u8 = 1;
    /// IR control 1
    pub const IRCR1: u8 = 2;
    /// Transmit frame current count low (read)
    pub const TFRCCL: u8 = 4;
    /// Transmit frame current count high (read)
    pub const TFRCCH: u8 = 5;
    /// Receive frame maximum length low
    pub const RFRML_L: u8 = 6;
    /// Receive frame maximum length high
    pub const RFRML_H: u8 = 7;
}

/// Bank 5 register offsets
pub mod bank5 {
    /// Frame status (head of the status FIFO)
    pub const FRM_ST: u8 = 5;
    /// Received frame length low
    pub const RFRL_L: u8 = 6;
    /// Received frame length high; reading pops the status FIFO entry
    pub const RFRL_H: u8 = 7;
}

/// Bank 7 register offsets
pub mod bank7 {
    /// IR receiver demodulator control
    pub const IRRXDC: u8 = 0;
    /// IR transmitter modulator control
    pub const IRTXMC: u8 = 1;
    /// Consumer IR / IrDA configuration
    pub const RCCFG: u8 = 2;
    /// Transceiver channel A: IRSL pins and ID sense
    pub const IRCFG1: u8 = 4;
    /// Transceiver channel B: IRSL pins and ID sense
    pub const IRCFG2: u8 = 5;
}

/// Interrupt enable bits (extended layout; bits 0-2 match the 16550)
pub mod ier {
    /// RX data available / high data level
    pub const RXHDL: u8 = 0x01;
    /// TX holding register empty / low data level
    pub const TXLDL: u8 = 0x02;
    /// Line status
    pub const LS: u8 = 0x04;
    /// Modem status
    pub const MS: u8 = 0x08;
    /// DMA terminal count
    pub const DMA: u8 = 0x10;
    /// Transmitter empty
    pub const TXEMP: u8 = 0x20;
    /// Status FIFO threshold
    pub const SFIF: u8 = 0x40;
    /// Hardware timer
    pub const TMR: u8 = 0x80;

    /// SIR while a packet is being fed to the UART
    pub const SIR_XMIT_MODE: u8 = TXLDL;
    /// SIR while receiving
    pub const SIR_RCV_MODE: u8 = RXHDL | LS;
    /// FIR/MIR waiting for a frame end
    pub const FIR_RCV_MODE: u8 = LS;
    /// FIR/MIR transmit DMA in flight
    pub const FIR_XMIT_MODE: u8 = DMA | LS;
    /// FIR/MIR waiting for the receive settle timer
    pub const FIR_TIMER_MODE: u8 = TMR | DMA;
}

/// Interrupt identification (16550 layout, non-extended mode)
pub mod iir {
    /// Set when no interrupt is pending
    pub const NO_INT: u8 = 0x01;
    /// Interrupt ID field
    pub const ID_MASK: u8 = 0x0E;
    /// Receiver line status
    pub const LINE_STATUS: u8 = 0x06;
    /// Received data available
    pub const RX_DATA: u8 = 0x04;
    /// Character timeout
    pub const CHAR_TIMEOUT: u8 = 0x0C;
    /// Transmit holding register empty
    pub const THR_EMPTY: u8 = 0x02;
    /// Modem status
    pub const MODEM_STATUS: u8 = 0x00;
    /// Both bits set when the FIFOs are enabled
    pub const FIFOS_ENABLED: u8 = 0xC0;
}

/// FIFO control (write)
pub mod fcr {
    /// FIFO enable
    pub const ENABLE: u8 = 0x01;
    /// RX FIFO reset
    pub const RX_RESET: u8 = 0x02;
    /// TX FIFO reset
    pub const TX_RESET: u8 = 0x04;
    /// Enable and flush both FIFOs
    pub const RESET_AND_ENABLE: u8 = ENABLE | RX_RESET | TX_RESET;
    /// Flush both FIFOs
    pub const SOFT_RESET: u8 = RX_RESET | TX_RESET;
}

/// Line status
pub mod lsr {
    /// RX data available
    pub const RXDA: u8 = 0x01;
    /// Overrun
    pub const OE: u8 = 0x02;
    /// Parity error (FIR: maximum length exceeded)
    pub const PE: u8 = 0x04;
    /// Framing error (FIR: physical layer error)
    pub const FE: u8 = 0x08;
    /// Break (FIR: frame end)
    pub const BRK: u8 = 0x10;
    /// Transmitter ready (THR empty)
    pub const TXRDY: u8 = 0x20;
    /// Transmitter empty (THR and shift register)
    pub const TXEMP: u8 = 0x40;
    /// Error in RX FIFO
    pub const ER: u8 = 0x80;
    /// Any receive error
    pub const ERRORS: u8 = OE | PE | FE | BRK;
}

/// Modem control
pub mod mcr {
    /// DTR, RTS, OUT1, OUT2 asserted (non-extended mode)
    pub const MODEM_LINES: u8 = 0x0F;
    /// DMA enable (extended mode)
    pub const DMA_EN: u8 = 0x04;
    /// Transmit deferral (extended mode)
    pub const TX_DFR: u8 = 0x08;
    /// IR pulse shaping (extended mode)
    pub const IR_PLS: u8 = 0x10;
    /// Mode field mask
    pub const MODE_MASK: u8 = 0xE0;
    /// SIR mode
    pub const MODE_SIR: u8 = 0x60;
    /// MIR mode
    pub const MODE_MIR: u8 = 0x80;
    /// FIR mode
    pub const MODE_FIR: u8 = 0xA0;
}

/// Auxiliary status and control
pub mod ascr {
    /// Transmit underrun (write 1 to clear)
    pub const TXUR: u8 = 0x40;
}

/// Extended control 1
pub mod excr1 {
    /// Extended mode select
    pub const EXT_SL: u8 = 0x01;
    /// DMA fairness
    pub const DMANF: u8 = 0x02;
    /// DMA threshold
    pub const DMATH: u8 = 0x04;
    /// DMA swap: route the shared channel to the transmitter
    pub const DMASWP: u8 = 0x08;

    /// 16550 compatible mode
    pub const NON_EXTENDED: u8 = DMANF;
    /// Extended mode, DMA towards the receiver
    pub const RX_DMA: u8 = EXT_SL | DMANF;
    /// Extended mode, DMA towards the transmitter
    pub const TX_DMA: u8 = EXT_SL | DMANF | DMASWP;
}

/// IR control 1
pub mod ircr1 {
    /// Timer enable
    pub const TMR_EN: u8 = 0x01;
}

/// Frame status (status FIFO head)
pub mod frm_st {
    /// Entry valid
    pub const VLD: u8 = 0x80;
    /// Frames lost; the length field holds the count
    pub const LOST_FR: u8 = 0x40;
    /// Maximum length exceeded
    pub const MAX_LEN: u8 = 0x10;
    /// Physical layer error
    pub const PHY_ERR: u8 = 0x08;
    /// CRC error
    pub const BAD_CRC: u8 = 0x04;
    /// RX FIFO overrun
    pub const OVR1: u8 = 0x02;
    /// Status FIFO overrun
    pub const OVR2: u8 = 0x01;
    /// Any error making the entry's data unusable
    pub const ERRORS: u8 = MAX_LEN | PHY_ERR | BAD_CRC | OVR1 | OVR2;
}

/// Transceiver configuration (bank 7 IRCFG1/IRCFG2)
pub mod ircfg {
    /// IRSL output pins driven for mode selection
    pub const IRSL_MASK: u8 = 0x07;
    /// ID pins sampled while sensing is enabled
    pub const ID_MASK: u8 = 0x1F;
    /// Switch pins to inputs and sense the transceiver ID
    pub const ID_SENSE: u8 = 0x20;
}
