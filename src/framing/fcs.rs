//! CCITT-16 frame check sequence
//!
//! Reflected polynomial 0x8408, initial value [`INIT_FCS`]. Transmit appends
//! the one's complement of the running value, low byte first; running the
//! receive check over data plus trailer leaves [`GOOD_FCS`].

use crate::internal::constants::{GOOD_FCS, INIT_FCS};

const POLY: u16 = 0x8408;

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLY } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Lookup table shared by the transmit and receive paths
pub static FCS_TABLE: [u16; 256] = build_table();

/// Fold one byte into a running FCS
#[inline]
pub fn update(fcs: u16, byte: u8) -> u16 {
    (fcs >> 8) ^ FCS_TABLE[usize::from((fcs ^ u16::from(byte)) as u8)]
}

/// FCS over `data` starting from [`INIT_FCS`]
pub fn compute(data: &[u8]) -> u16 {
    data.iter().fold(INIT_FCS, |fcs, &b| update(fcs, b))
}

/// Check a frame that still carries its 2-byte trailer
pub fn is_valid(frame: &[u8]) -> bool {
    compute(frame) == GOOD_FCS
}

/// Trailer bytes for a running FCS, in wire order
#[inline]
pub fn trailer(fcs: u16) -> [u8; 2] {
    (!fcs).to_le_bytes()
}
