//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for buffer management and a state machine for
//! handling fragmented frames:
//! - `WaitingForHeader`: need at least 6 bytes
//! - `WaitingForBody`: header parsed, need tag + payload bytes

use bytes::{Bytes, BytesMut};

use super::wire::{FrameHeader, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
use crate::error::{CrosswireError, Result};

/// A complete frame extracted from the stream.
#[derive(Debug, Clone)]
pub struct WireFrame {
    /// Message tag (operation name or derived reply tag).
    pub tag: String,
    /// MessagePack-encoded payload bytes.
    pub payload: Bytes,
}

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete header.
    WaitingForHeader,
    /// Header parsed, waiting for tag and payload bytes.
    WaitingForBody { header: FrameHeader },
}

/// Buffer accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with a custom max payload size.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
            max_payload_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Partial data is buffered internally for the next push.
    ///
    /// # Errors
    ///
    /// Returns an error on protocol violations: empty tag, payload over the
    /// configured maximum, or a tag that is not valid UTF-8.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<WireFrame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<WireFrame>> {
        if let State::WaitingForHeader = self.state {
            let Some(header) = FrameHeader::decode(&self.buffer) else {
                return Ok(None);
            };
            header.validate(self.max_payload_size)?;
            let _ = self.buffer.split_to(HEADER_SIZE);
            self.state = State::WaitingForBody { header };
        }

        let State::WaitingForBody { header } = self.state else {
            return Ok(None);
        };

        if self.buffer.len() < header.body_length() {
            return Ok(None);
        }

        let mut body = self.buffer.split_to(header.body_length());
        let tag_bytes = body.split_to(header.tag_length as usize);
        let tag = std::str::from_utf8(&tag_bytes)
            .map_err(|_| CrosswireError::Protocol("Frame tag is not valid UTF-8".to_string()))?
            .to_string();

        self.state = State::WaitingForHeader;
        Ok(Some(WireFrame {
            tag,
            payload: body.freeze(),
        }))
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
