//! Splitting a register transfer into bus-sized chunks.

use crate::errors::{PlatformError, PlatformResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Bytes of register address prepended to every write chunk.
pub const HEADER_LEN: usize = 2;

/// Size of the 16-bit register space.
pub const REGISTER_SPACE: usize = 0x1_0000;

/// What a zero-length transfer puts on the bus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroLengthPolicy {
    /// Issue one transaction carrying no payload (address header only).
    #[default]
    Probe,
    /// Issue nothing.
    Skip,
}

/// One bus transaction's slice of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub register: u16,
    pub offset: usize,
    pub len: usize,
}

impl Chunk {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Rejects transfers that would run past register 0xFFFF.
pub fn check_register_span(register: u16, len: usize) -> PlatformResult<()> {
    if register as usize + len > REGISTER_SPACE {
        return Err(PlatformError::TransferRange { register, len });
    }
    Ok(())
}

/// Iterator over the chunks of a `count`-byte transfer at `register`.
///
/// The caller must have checked the span with [`check_register_span`].
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    register: u16,
    count: usize,
    max_len: usize,
    position: usize,
    probe_pending: bool,
}

impl ChunkPlan {
    pub fn new(register: u16, count: usize, max_len: usize, zero_length: ZeroLengthPolicy) -> Self {
        debug_assert!(max_len > 0);
        Self {
            register,
            count,
            max_len: max_len.max(1),
            position: 0,
            probe_pending: count == 0 && zero_length == ZeroLengthPolicy::Probe,
        }
    }
}

impl Iterator for ChunkPlan {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.position < self.count {
            let len = (self.count - self.position).min(self.max_len);
            let chunk = Chunk {
                register: (self.register as usize + self.position) as u16,
                offset: self.position,
                len,
            };
            self.position += len;
            return Some(chunk);
        }
        if self.probe_pending {
            self.probe_pending = false;
            return Some(Chunk {
                register: self.register,
                offset: 0,
                len: 0,
            });
        }
        None
    }
}
