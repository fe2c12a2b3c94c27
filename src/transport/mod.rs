//! Stream transport - runs the bridge across a byte stream.
//!
//! Adapts any `AsyncRead`/`AsyncWrite` pair (pipe, socket, `duplex`) into a
//! [`Channel`](crate::channel::Channel):
//! - fixed 6-byte header encoding/decoding (big endian)
//! - frame buffer for accumulating partial reads
//! - dedicated writer task fed by an mpsc queue
//! - MessagePack payload encoding

mod frame_buffer;
mod stream;
mod wire;

pub use frame_buffer::{FrameBuffer, WireFrame};
pub use stream::StreamChannel;
pub use wire::{build_frame, FrameHeader, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
