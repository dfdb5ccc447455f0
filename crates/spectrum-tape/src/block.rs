//! The stored form of a standard-speed tape data block.

use thiserror::Error;

/// Errors raised while parsing or building a tape block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TapeBlockError {
    #[error("block truncated: need {needed} bytes, only {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("block payload is empty")]
    EmptyPayload,
    #[error("payload of {0} bytes exceeds the 16-bit length field")]
    PayloadTooLong(usize),
}

/// One standard-speed data block.
///
/// On disk the block is little-endian: a 16-bit pause (in milliseconds)
/// to hold after playback, a 16-bit payload length, then the payload.
/// The first payload byte is the flag byte; its high bit distinguishes
/// header blocks (clear) from data blocks (set), which decides the pilot
/// tone length during playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeBlock {
    pause_after_ms: u16,
    payload: Vec<u8>,
}

impl TapeBlock {
    /// Build a block from its parts.
    ///
    /// # Errors
    ///
    /// Fails when the payload is empty or longer than the 16-bit length
    /// field can describe.
    pub fn new(pause_after_ms: u16, payload: Vec<u8>) -> Result<Self, TapeBlockError> {
        if payload.is_empty() {
            return Err(TapeBlockError::EmptyPayload);
        }
        if payload.len() > usize::from(u16::MAX) {
            return Err(TapeBlockError::PayloadTooLong(payload.len()));
        }
        Ok(Self {
            pause_after_ms,
            payload,
        })
    }

    /// Parse one block from the head of `bytes`. Returns the block and
    /// the number of bytes consumed, so callers can walk a sequence of
    /// blocks through a buffer.
    ///
    /// # Errors
    ///
    /// Fails when the header or payload runs past the end of `bytes`,
    /// or when the stored payload length is zero.
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), TapeBlockError> {
        if bytes.len() < 4 {
            return Err(TapeBlockError::Truncated {
                needed: 4,
                available: bytes.len(),
            });
        }
        let pause_after_ms = u16::from_le_bytes([bytes[0], bytes[1]]);
        let length = usize::from(u16::from_le_bytes([bytes[2], bytes[3]]));
        if length == 0 {
            return Err(TapeBlockError::EmptyPayload);
        }
        let total = 4 + length;
        if bytes.len() < total {
            return Err(TapeBlockError::Truncated {
                needed: total,
                available: bytes.len(),
            });
        }
        Ok((
            Self {
                pause_after_ms,
                payload: bytes[4..total].to_vec(),
            },
            total,
        ))
    }

    /// Append the stored form of the block to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.pause_after_ms.to_le_bytes());
        out.extend_from_slice(&(self.payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.payload);
    }

    /// Milliseconds of silence to hold after the data has played.
    #[must_use]
    pub const fn pause_after_ms(&self) -> u16 {
        self.pause_after_ms
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// True when the flag byte marks this as a header block.
    #[must_use]
    pub fn is_header(&self) -> bool {
        self.payload[0] & 0x80 == 0
    }
}
