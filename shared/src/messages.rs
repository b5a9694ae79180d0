//! # ADCS Message Definitions
//!
//! Commands and telemetry exchanged between the ADCS board and the on-board
//! computer. Each message travels as one link payload, serialized with
//! `postcard` for compact, no_std-compatible encoding.
//!
//! ## Payload Format
//!
//! ```text
//! ┌────────┬───────────────────────────────┐
//! │  Code  │         postcard body         │
//! │ 1 byte │  ≤ MAX_PAYLOAD_LEN - 1 bytes  │
//! └────────┴───────────────────────────────┘
//! ```
//!
//! The body is postcard, not the packed little-endian structs of the C
//! firmware: `f32` fields are 4 bytes little-endian, but `u16` and `u32`
//! fields are varints. Both ends of a line must run this crate.
//!
//! ## Message Codes
//!
//! - **0-19**: commands from the on-board computer (set opmode, set attitude)
//! - **20-39**: telemetry from the ADCS (opmode, attitude, housekeeping)

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::MAX_PAYLOAD_LEN;

/// Message codes, first byte of every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageCode {
    /// Switch the ADCS operating mode
    SetOpmode = 0,
    /// Request an attitude change
    SetAttitude = 1,
    /// Current operating mode
    Opmode = 20,
    /// Attitude estimate
    Attitude = 21,
    /// Temperatures and currents
    Housekeeping = 22,
}

impl TryFrom<u8> for MessageCode {
    type Error = MessageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::SetOpmode),
            1 => Ok(Self::SetAttitude),
            20 => Ok(Self::Opmode),
            21 => Ok(Self::Attitude),
            22 => Ok(Self::Housekeeping),
            other => Err(MessageError::UnknownCode(other)),
        }
    }
}

/// x, y, z components
pub type Vector3 = [f32; 3];

/// Desired attitude change
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttitudeSetpoint {
    pub delta_omega: Vector3,
    pub delta_b: Vector3,
    pub delta_theta: Vector3,
}

/// Attitude estimate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttitudeReport {
    /// Angular rate
    pub omega: Vector3,
    /// Magnetic field
    pub b: Vector3,
    pub theta: Vector3,
    pub sun_theta: Vector3,
    /// Board tick at sampling time
    pub tick: u32,
}

/// Board health readings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HousekeepingReport {
    pub temperature: [f32; 8],
    pub temperature_raw: [u16; 8],
    pub current: [f32; 5],
    pub current_raw: [u16; 5],
    /// Board tick at sampling time
    pub tick: u32,
}

/// Message decoding and encoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    #[error("empty payload")]
    Empty,
    #[error("unknown message code: {0}")]
    UnknownCode(u8),
    #[error("message does not fit the buffer")]
    BufferTooSmall,
    #[error("malformed message body")]
    Malformed,
}

/// One ADCS message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    SetOpmode { opmode: u8 },
    SetAttitude(AttitudeSetpoint),
    Opmode { opmode: u8 },
    Attitude(AttitudeReport),
    Housekeeping(HousekeepingReport),
}

impl Message {
    pub fn code(&self) -> MessageCode {
        match self {
            Self::SetOpmode { .. } => MessageCode::SetOpmode,
            Self::SetAttitude(_) => MessageCode::SetAttitude,
            Self::Opmode { .. } => MessageCode::Opmode,
            Self::Attitude(_) => MessageCode::Attitude,
            Self::Housekeeping(_) => MessageCode::Housekeeping,
        }
    }

    /// Encode into `buf`, returning the used prefix
    pub fn encode<'b>(&self, buf: &'b mut [u8]) -> Result<&'b [u8], MessageError> {
        let (code, body) = buf.split_first_mut().ok_or(MessageError::BufferTooSmall)?;
        *code = self.code() as u8;

        let written = match self {
            Self::SetOpmode { opmode } | Self::Opmode { opmode } => postcard::to_slice(opmode, body),
            Self::SetAttitude(setpoint) => postcard::to_slice(setpoint, body),
            Self::Attitude(report) => postcard::to_slice(report, body),
            Self::Housekeeping(report) => postcard::to_slice(report, body),
        }
        .map_err(|_| MessageError::BufferTooSmall)?
        .len();

        Ok(&buf[..1 + written])
    }

    /// Decode a link payload
    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        let (&code, body) = bytes.split_first().ok_or(MessageError::Empty)?;

        let message = match MessageCode::try_from(code)? {
            MessageCode::SetOpmode => Self::SetOpmode {
                opmode: from_body(body)?,
            },
            MessageCode::SetAttitude => Self::SetAttitude(from_body(body)?),
            MessageCode::Opmode => Self::Opmode {
                opmode: from_body(body)?,
            },
            MessageCode::Attitude => Self::Attitude(from_body(body)?),
            MessageCode::Housekeeping => Self::Housekeeping(from_body(body)?),
        };
        Ok(message)
    }

    /// Encode into a payload ready for [`LinkSession::send`](crate::LinkSession::send)
    pub fn to_payload(&self) -> Result<Vec<u8, MAX_PAYLOAD_LEN>, MessageError> {
        let mut buf = [0u8; MAX_PAYLOAD_LEN];
        let encoded = self.encode(&mut buf)?;
        Vec::from_slice(encoded).map_err(|_| MessageError::BufferTooSmall)
    }
}

fn from_body<'de, T: Deserialize<'de>>(body: &'de [u8]) -> Result<T, MessageError> {
    postcard::from_bytes(body).map_err(|_| MessageError::Malformed)
}
