//! Packet conversion
//!
//! Turns a fragmented outgoing packet into the contiguous bytes the
//! hardware sends: an escaped, delimited SIR frame with FCS, or a plain
//! linear copy for the hardware-framed MIR/FIR paths.

use crate::error::{DmaError, Error, IoError, Result};
use crate::internal::constants::{
    INIT_FCS, MAX_EXTRA_SIR_BOFS, MAX_NDIS_DATA_SIZE, SIR_BOF, SIR_EOF, SIR_ESC, SIR_ESC_COMPL,
};

use super::fcs;

#[inline]
fn needs_escape(byte: u8) -> bool {
    matches!(byte, SIR_BOF | SIR_EOF | SIR_ESC)
}

#[inline]
fn put(out: &mut [u8], pos: &mut usize, byte: u8) -> Result<()> {
    let slot = out.get_mut(*pos).ok_or(Error::Io(IoError::BufferTooSmall))?;
    *slot = byte;
    *pos += 1;
    Ok(())
}

#[inline]
fn put_escaped(out: &mut [u8], pos: &mut usize, byte: u8) -> Result<()> {
    if needs_escape(byte) {
        put(out, pos, SIR_ESC)?;
        put(out, pos, byte ^ SIR_ESC_COMPL)
    } else {
        put(out, pos, byte)
    }
}

/// Escape `data` into `out`, folding every raw byte into `fcs`
///
/// Returns the number of bytes written.
pub fn escape_slow_ir_data(data: &[u8], out: &mut [u8], fcs_acc: &mut u16) -> Result<usize> {
    let mut pos = 0;
    for &byte in data {
        *fcs_acc = fcs::update(*fcs_acc, byte);
        put_escaped(out, &mut pos, byte)?;
    }
    Ok(pos)
}

/// Remove SIR escapes from `data` into `out`
///
/// The input is the content between delimiters. A trailing lone ESC or an
/// ESC followed by a delimiter is rejected.
pub fn unescape_slow_ir_data(data: &[u8], out: &mut [u8]) -> Result<usize> {
    let mut pos = 0;
    let mut bytes = data.iter().copied();
    while let Some(byte) = bytes.next() {
        let value = if byte == SIR_ESC {
            match bytes.next() {
                Some(next) if !needs_escape(next) => next ^ SIR_ESC_COMPL,
                _ => return Err(Error::Io(IoError::InvalidFrame)),
            }
        } else {
            byte
        };
        put(out, &mut pos, value)?;
    }
    Ok(pos)
}

/// Build a complete SIR frame from packet fragments
///
/// Layout is `[extra BOFs] BOF data FCS EOF`, with data and FCS escaped.
/// Extra BOFs are capped at 48; the packet may be at most
/// `MAX_NDIS_DATA_SIZE` bytes.
pub fn ndis_to_ir_packet<'a, I>(fragments: I, extra_bofs: usize, out: &mut [u8]) -> Result<usize>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut pos = 0;
    for _ in 0..extra_bofs.min(MAX_EXTRA_SIR_BOFS) {
        put(out, &mut pos, SIR_BOF)?;
    }
    put(out, &mut pos, SIR_BOF)?;

    let mut total = 0usize;
    let mut fcs_acc = INIT_FCS;
    for fragment in fragments {
        total = total
            .checked_add(fragment.len())
            .filter(|&t| t <= MAX_NDIS_DATA_SIZE)
            .ok_or(Error::Dma(DmaError::FrameTooLarge))?;
        pos += escape_slow_ir_data(fragment, &mut out[pos..], &mut fcs_acc)?;
    }

    for byte in fcs::trailer(fcs_acc) {
        put_escaped(out, &mut pos, byte)?;
    }
    put(out, &mut pos, SIR_EOF)?;
    Ok(pos)
}

/// Build a SIR frame from one contiguous payload
pub fn build_sir_frame(payload: &[u8], extra_bofs: usize, out: &mut [u8]) -> Result<usize> {
    ndis_to_ir_packet(core::iter::once(payload), extra_bofs, out)
}

/// Copy packet fragments into one contiguous FIR/MIR transmit buffer
pub fn ndis_to_fir_packet<'a, I>(fragments: I, out: &mut [u8]) -> Result<usize>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut total = 0usize;
    for fragment in fragments {
        let end = total
            .checked_add(fragment.len())
            .filter(|&end| end <= MAX_NDIS_DATA_SIZE)
            .ok_or(Error::Dma(DmaError::FrameTooLarge))?;
        out.get_mut(total..end)
            .ok_or(Error::Io(IoError::BufferTooSmall))?
            .copy_from_slice(fragment);
        total = end;
    }
    Ok(total)
}
