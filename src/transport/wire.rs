//! Wire format encoding and decoding.
//!
//! Implements the 6-byte frame header:
//! ```text
//! ┌───────────┬────────────┐
//! │ Tag Len   │ Payload Len│
//! │ 2 bytes   │ 4 bytes    │
//! │ uint16 BE │ uint32 BE  │
//! └───────────┴────────────┘
//! ```
//! The header is followed by the UTF-8 tag bytes and the MessagePack
//! payload bytes. All multi-byte integers are Big Endian.

use crate::error::{CrosswireError, Result};

/// Header size in bytes (fixed, exactly 6).
pub const HEADER_SIZE: usize = 6;

/// Default maximum payload size (64 MB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 67_108_864;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Length of the UTF-8 tag in bytes (1-65535, 0 is invalid).
    pub tag_length: u16,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl FrameHeader {
    /// Create a new header.
    pub fn new(tag_length: u16, payload_length: u32) -> Self {
        Self {
            tag_length,
            payload_length,
        }
    }

    /// Encode header to bytes (Big Endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.tag_length.to_be_bytes());
        buf[2..6].copy_from_slice(&self.payload_length.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if the buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            tag_length: u16::from_be_bytes([buf[0], buf[1]]),
            payload_length: u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]),
        })
    }

    /// Validate the header for protocol compliance.
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.tag_length == 0 {
            return Err(CrosswireError::Protocol(
                "Frame tag must not be empty".to_string(),
            ));
        }
        if self.payload_length > max_payload_size {
            return Err(CrosswireError::Protocol(format!(
                "Payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }
        Ok(())
    }

    /// Total length of the body following the header (tag + payload).
    pub fn body_length(&self) -> usize {
        self.tag_length as usize + self.payload_length as usize
    }
}

/// Build a complete frame as a single byte vector.
///
/// Encodes the header and appends tag and payload into a contiguous buffer.
pub fn build_frame(tag: &str, payload: &[u8]) -> Result<Vec<u8>> {
    let tag_bytes = tag.as_bytes();
    if tag_bytes.is_empty() {
        return Err(CrosswireError::Protocol(
            "Frame tag must not be empty".to_string(),
        ));
    }
    let tag_length = u16::try_from(tag_bytes.len()).map_err(|_| {
        CrosswireError::Protocol(format!(
            "Tag length {} exceeds maximum {}",
            tag_bytes.len(),
            u16::MAX
        ))
    })?;

    let header = FrameHeader::new(tag_length, payload.len() as u32);
    let mut buf = Vec::with_capacity(HEADER_SIZE + tag_bytes.len() + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(tag_bytes);
    buf.extend_from_slice(payload);
    Ok(buf)
}
