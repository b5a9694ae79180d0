//! # Frame Codec
//!
//! Turns a header + payload held in a [`RingBuffer`] into a wire frame and
//! back, in place.
//!
//! ## Frame Format
//!
//! ```text
//! ┌──────┬──────┬───────────┬──────────┬─────────────┬──────────┬──────┐
//! │ FLAG │ Code │ AckWanted │ Hash BE  │   Payload   │ CRC16 BE │ FLAG │
//! │ 0x7E │ 1 B  │    1 B    │   2 B    │   ≤ 128 B   │   2 B    │ 0x7E │
//! └──────┴──────┴───────────┴──────────┴─────────────┴──────────┴──────┘
//!        └──────────────── byte stuffed ─────────────────────────┘
//! ```
//!
//! ## Byte Stuffing
//!
//! `0x7E` and `0x7D` inside the frame become `0x7D` followed by the byte with
//! bit 5 inverted (`0x7E → 7D 5E`, `0x7D → 7D 5D`), so a flag byte can only
//! appear at the frame edges.
//!
//! ## CRC
//!
//! CRC-16/CCITT-FALSE: polynomial `0x1021`, initial value `0xFFFF`, MSB first,
//! no final xor. Running the CRC over content plus appended CRC yields zero.

use crate::buffer::{ByteRing, End, RingBuffer};
use crate::{ESCAPE, ESCAPE_MASK, FRAME_FLAG, HEADER_LEN};

/// CRC-16 polynomial
pub const CRC_POLY: u16 = 0x1021;

/// CRC-16 initial value
pub const CRC_INIT: u16 = 0xFFFF;

/// Byte-indexed CRC lookup table, generated at compile time
pub const CRC_TABLE: [u16; 256] = crc_table(CRC_POLY);

const fn crc_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ poly
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

#[inline]
fn crc_update(crc: u16, byte: u8) -> u16 {
    let crc = crc ^ ((byte as u16) << 8);
    (crc << 8) ^ CRC_TABLE[(crc >> 8) as usize]
}

/// CRC-16 over a byte slice
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(CRC_INIT, |crc, &byte| crc_update(crc, byte))
}

/// CRC-16 over the valid bytes of a ring, head to tail
pub fn crc16_ring<R: ByteRing + ?Sized>(ring: &R) -> u16 {
    ring.as_slices().iter().fold(CRC_INIT, crc_update)
}

/// Framing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    #[error("buffer too small for the encoded frame")]
    BufferTooSmall,
    #[error("nothing to encode or decode")]
    Empty,
    #[error("frame does not start and end with a flag byte")]
    MissingDelimiter,
    #[error("unescaped flag byte inside frame")]
    UnescapedFlag,
    #[error("escape byte not followed by an escaped flag or escape")]
    InvalidEscape,
    #[error("CRC mismatch")]
    CrcMismatch,
    #[error("frame shorter than its fixed fields")]
    Truncated,
    #[error("unknown frame code: {0:#04x}")]
    UnknownCode(u8),
}

/// Append the CRC of the buffer content, big-endian
pub fn append_crc<S: AsRef<[u8]> + AsMut<[u8]>>(buffer: &mut RingBuffer<S>) -> Result<(), FrameError> {
    if buffer.free() < 2 {
        return Err(FrameError::BufferTooSmall);
    }
    let crc = crc16_ring(buffer);
    buffer.push_bounded(&crc.to_be_bytes(), End::Tail);
    Ok(())
}

/// Verify the trailing CRC and drop it
///
/// The two CRC bytes are removed even when verification fails.
pub fn strip_crc<S: AsRef<[u8]> + AsMut<[u8]>>(buffer: &mut RingBuffer<S>) -> Result<(), FrameError> {
    if buffer.len() < 2 {
        return Err(FrameError::Truncated);
    }
    let residue = crc16_ring(buffer);
    buffer.discard(2, End::Tail);
    if residue == 0 {
        Ok(())
    } else {
        Err(FrameError::CrcMismatch)
    }
}

fn pop_head<S: AsRef<[u8]> + AsMut<[u8]>>(buffer: &mut RingBuffer<S>) -> Option<u8> {
    let mut byte = [0u8; 1];
    (buffer.pull(&mut byte, End::Head) == 1).then_some(byte[0])
}

/// Escape flag and escape bytes in place
///
/// Bytes are pulled from the head and pushed back at the tail. An empty or
/// already full buffer is refused. If the escaped content does not fit, the
/// buffer is left corrupted and must be flushed before reuse.
pub fn stuff<S: AsRef<[u8]> + AsMut<[u8]>>(buffer: &mut RingBuffer<S>) -> Result<(), FrameError> {
    if buffer.is_empty() {
        return Err(FrameError::Empty);
    }
    if buffer.is_full() {
        return Err(FrameError::BufferTooSmall);
    }

    for _ in 0..buffer.len() {
        let Some(mut byte) = pop_head(buffer) else {
            return Err(FrameError::Truncated);
        };
        if byte == FRAME_FLAG || byte == ESCAPE {
            if buffer.push_bounded(&[ESCAPE], End::Tail) == 0 {
                return Err(FrameError::BufferTooSmall);
            }
            byte ^= ESCAPE_MASK;
        }
        if buffer.push_bounded(&[byte], End::Tail) == 0 {
            return Err(FrameError::BufferTooSmall);
        }
    }
    Ok(())
}

/// Undo [`stuff`] in place
pub fn unstuff<S: AsRef<[u8]> + AsMut<[u8]>>(buffer: &mut RingBuffer<S>) -> Result<(), FrameError> {
    if buffer.is_empty() {
        return Err(FrameError::Empty);
    }

    let mut remaining = buffer.len();
    while remaining > 0 {
        let Some(byte) = pop_head(buffer) else {
            return Err(FrameError::Truncated);
        };
        remaining -= 1;

        let byte = match byte {
            FRAME_FLAG => return Err(FrameError::UnescapedFlag),
            ESCAPE => {
                if remaining == 0 {
                    return Err(FrameError::InvalidEscape);
                }
                let escaped = pop_head(buffer).ok_or(FrameError::Truncated)? ^ ESCAPE_MASK;
                remaining -= 1;
                if escaped != ESCAPE && escaped != FRAME_FLAG {
                    return Err(FrameError::InvalidEscape);
                }
                escaped
            }
            plain => plain,
        };
        buffer.push_overwrite(&[byte], End::Tail);
    }
    Ok(())
}

/// Build a wire frame in place: CRC, stuffing, a flag at both ends
///
/// Worst case the buffer needs `2 * (content + 2) + 2` bytes. On failure the
/// content is corrupted.
pub fn frame<S: AsRef<[u8]> + AsMut<[u8]>>(buffer: &mut RingBuffer<S>) -> Result<(), FrameError> {
    append_crc(buffer)?;
    stuff(buffer)?;
    if buffer.free() < 2 {
        return Err(FrameError::BufferTooSmall);
    }
    buffer.push_overwrite(&[FRAME_FLAG], End::Head);
    buffer.push_overwrite(&[FRAME_FLAG], End::Tail);
    Ok(())
}

/// Reverse [`frame`] in place: check and drop the flags, unstuff, verify and
/// drop the CRC
pub fn deframe<S: AsRef<[u8]> + AsMut<[u8]>>(buffer: &mut RingBuffer<S>) -> Result<(), FrameError> {
    match pop_head(buffer) {
        Some(FRAME_FLAG) => {}
        Some(_) => return Err(FrameError::MissingDelimiter),
        None => return Err(FrameError::Empty),
    }
    let mut tail = [0u8; 1];
    if buffer.pull(&mut tail, End::Tail) == 0 || tail[0] != FRAME_FLAG {
        return Err(FrameError::MissingDelimiter);
    }

    unstuff(buffer)?;
    strip_crc(buffer)
}

/// Frame type carried in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameCode {
    /// Application payload
    Data = 0x00,
    /// Acknowledgment, empty payload
    Ack = 0x01,
}

impl TryFrom<u8> for FrameCode {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Data),
            0x01 => Ok(Self::Ack),
            other => Err(FrameError::UnknownCode(other)),
        }
    }
}

/// Header preceding every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    pub code: FrameCode,
    /// The receiver must answer with an ACK carrying the same hash
    pub ack_wanted: bool,
    /// Sender-side frame counter, used for ACK matching and duplicate detection
    pub hash: u16,
}

impl FrameHeader {
    /// Wire layout: code, ack flag, hash big-endian
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let hash = self.hash.to_be_bytes();
        [self.code as u8, self.ack_wanted as u8, hash[0], hash[1]]
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_LEN {
            return Err(FrameError::Truncated);
        }
        Ok(Self {
            code: FrameCode::try_from(bytes[0])?,
            ack_wanted: bytes[1] != 0,
            hash: u16::from_be_bytes([bytes[2], bytes[3]]),
        })
    }
}
