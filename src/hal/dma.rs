//! Shared DMA channel
//!
//! The controller has one system DMA channel, shared by receive and
//! transmit. [`DmaUtil`] records the single active transfer and refuses to
//! start another until it is completed.

use log::error;

use crate::error::{DmaError, DmaResult};

// =============================================================================
// DMA Channel Trait
// =============================================================================

/// Transfer direction on the shared channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaDirection {
    /// Device FIFO to memory (receive)
    FromDevice,
    /// Memory to device FIFO (transmit)
    ToDevice,
}

/// Host DMA adapter for the adapter's channel
///
/// Mirrors the host's system-DMA contract: a transfer is programmed over a
/// buffer window and completed explicitly. Completing a receive transfer
/// flushes any adapter (map register) buffering into the window.
pub trait DmaChannel {
    /// Program a device-to-memory transfer into `window`
    fn start_from_device(&mut self, window: &mut [u8]) -> DmaResult<()>;

    /// Stop the receive transfer; returns the number of bytes written to `window`
    fn complete_from_device(&mut self, window: &mut [u8]) -> DmaResult<usize>;

    /// Program a memory-to-device transfer of `data`
    fn start_to_device(&mut self, data: &[u8]) -> DmaResult<()>;

    /// Stop the transmit transfer
    fn complete_to_device(&mut self) -> DmaResult<()>;

    /// Bytes not yet transferred by the active transfer
    fn remaining(&self) -> u32;
}

// =============================================================================
// DMA Utility Block
// =============================================================================

/// The transfer currently owning the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaTransfer {
    /// Transfer direction
    pub direction: DmaDirection,
    /// Offset of the window in its buffer
    pub offset: usize,
    /// Window length in bytes
    pub len: usize,
}

/// Single-channel DMA bookkeeping
///
/// `active` is `None` when the channel is idle.
#[derive(Debug)]
pub struct DmaUtil<M> {
    channel: M,
    active: Option<DmaTransfer>,
}

impl<M: DmaChannel> DmaUtil<M> {
    /// Wrap a host DMA channel
    pub const fn new(channel: M) -> Self {
        Self {
            channel,
            active: None,
        }
    }

    /// Borrow the host channel
    pub fn channel(&self) -> &M {
        &self.channel
    }

    /// The active transfer, if any
    pub fn active(&self) -> Option<DmaTransfer> {
        self.active
    }

    /// Check if a transfer owns the channel
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Check if a transfer in `direction` owns the channel
    pub fn is_active_in(&self, direction: DmaDirection) -> bool {
        matches!(self.active, Some(t) if t.direction == direction)
    }

    /// Bytes left in the active transfer (0 when idle)
    pub fn remaining(&self) -> u32 {
        if self.active.is_some() {
            self.channel.remaining()
        } else {
            0
        }
    }

    /// Start receiving into `buffer[offset..offset + len]`
    pub fn start_transfer_from_device(
        &mut self,
        buffer: &mut [u8],
        offset: usize,
        len: usize,
    ) -> DmaResult<()> {
        self.claim(DmaDirection::FromDevice, buffer.len(), offset, len)?;
        let window = &mut buffer[offset..offset + len];
        if let Err(e) = self.channel.start_from_device(window) {
            self.active = None;
            return Err(e);
        }
        Ok(())
    }

    /// Complete the receive transfer into `buffer`; returns bytes transferred
    pub fn complete_transfer_from_device(&mut self, buffer: &mut [u8]) -> DmaResult<usize> {
        let transfer = self.release(DmaDirection::FromDevice)?;
        let window = &mut buffer[transfer.offset..transfer.offset + transfer.len];
        let transferred = self.channel.complete_from_device(window)?;
        Ok(transferred.min(transfer.len))
    }

    /// Start transmitting `buffer[offset..offset + len]`
    pub fn start_transfer_to_device(
        &mut self,
        buffer: &[u8],
        offset: usize,
        len: usize,
    ) -> DmaResult<()> {
        self.claim(DmaDirection::ToDevice, buffer.len(), offset, len)?;
        if let Err(e) = self.channel.start_to_device(&buffer[offset..offset + len]) {
            self.active = None;
            return Err(e);
        }
        Ok(())
    }

    /// Complete the transmit transfer
    pub fn complete_transfer_to_device(&mut self) -> DmaResult<()> {
        self.release(DmaDirection::ToDevice)?;
        self.channel.complete_to_device()
    }

    fn claim(
        &mut self,
        direction: DmaDirection,
        buffer_len: usize,
        offset: usize,
        len: usize,
    ) -> DmaResult<()> {
        if let Some(active) = self.active {
            error!("DMA start ({direction:?}) while {active:?} is active");
            return Err(DmaError::ChannelBusy);
        }
        let end = offset.checked_add(len).ok_or(DmaError::InvalidLength)?;
        if len == 0 || end > buffer_len {
            return Err(DmaError::InvalidLength);
        }
        self.active = Some(DmaTransfer {
            direction,
            offset,
            len,
        });
        Ok(())
    }

    fn release(&mut self, direction: DmaDirection) -> DmaResult<DmaTransfer> {
        let transfer = self.active.ok_or(DmaError::NotActive)?;
        if transfer.direction != direction {
            return Err(DmaError::DirectionMismatch);
        }
        self.active = None;
        Ok(transfer)
    }
}

// =============================================================================
// Tests
// =============================================================================
