//! # Simple Data Link
//!
//! This crate provides the byte-stream framing and link-reliability core shared
//! by the ADCS board and the CDH on-board computer:
//!
//! - **Ring Buffers**: fixed-capacity circular byte buffers over caller storage
//! - **Frame Search**: policy-driven delimited frame search on a ring buffer
//! - **Codec**: CRC-16, HDLC-like byte stuffing and the 4-byte frame header
//! - **Link**: acknowledged send with retries, duplicate suppression and an
//!   optional anti-deadlock side queue
//! - **Messages**: the ADCS command/telemetry schema carried as link payloads
//!
//! ## Architecture
//!
//! ```text
//! Transport ──► rx RingBuffer ──► search ──► scratch ──► deframe ──► payload
//!                                                                     │
//! Transport ◄── frame (flags + stuffing + CRC) ◄── header + payload ◄─┘
//! ```
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────┬──────────────────────────────────────────────────┬──────┐
//! │ 0x7E │ stuffed( header 4B │ payload ≤128B │ CRC16 2B ) │ 0x7E │
//! └──────┴──────────────────────────────────────────────────┴──────┘
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod buffer;
pub mod codec;
pub mod link;
pub mod messages;
pub mod search;
pub mod traits;

// Re-export main types for convenience
pub use buffer::{move_across, BufferSlice, ByteRing, End, RingBuffer, RingView, Rotation};
pub use codec::{crc16, deframe, frame, FrameCode, FrameError, FrameHeader};
pub use link::{LinkConfig, LinkError, LinkSession, LinkStats};
pub use messages::{Message, MessageCode, MessageError};
pub use search::{search, search_and_advance, Advance, FrameMatch, Policy, SearchRule};
pub use traits::{IoTransport, TickSource, Transport};

/// Library version for protocol compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest payload a single frame carries
pub const MAX_PAYLOAD_LEN: usize = 128;

/// Encoded frame header: code, ack flag, hash (big-endian)
pub const HEADER_LEN: usize = 4;

/// Appended CRC-16, big-endian
pub const CRC_LEN: usize = 2;

/// Frame delimiter
pub const FRAME_FLAG: u8 = 0x7E;

/// Stuffing escape byte
pub const ESCAPE: u8 = 0x7D;

/// Bit flipped on an escaped byte
pub const ESCAPE_MASK: u8 = 0x20;

/// Worst-case frame size between the flags, every byte escaped
pub const MAX_STUFFED_LEN: usize = 2 * (HEADER_LEN + MAX_PAYLOAD_LEN + CRC_LEN);

/// Receive and scratch buffer size per line: one worst-case frame with flags
pub const LINE_BUFFER_LEN: usize = MAX_STUFFED_LEN + 2;

/// Side queue depth configured on the boards
pub const ANTI_LOCK_DEPTH: usize = 5;
