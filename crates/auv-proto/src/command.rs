//! Uplink (base station -> vehicle) payload classification.
//!
//! Payload layout, bit 23 is the MSB:
//!
//! ```text
//! ping      1111_1111_1111_1111_1111_1111
//! navigate  001. .... ..DD DDDS AAAA AAAA   D distance m, S turn sign, A turn degrees
//! teleop    111. ...V XXXX XXXX YYYY YYYY   V vertical, X/Y sign bit + 7-bit magnitude
//! dive      110. .... .... .... ..DD DDDD   D target depth m
//! action    000. ..DD DDDD TTTT TTTT TCCC   D depth m, T duration s, C action code
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::PAYLOAD_MASK;

/// Keep-alive sentinel.
pub const PING: u32 = 0xFF_FFFF;

const HEADER_SHIFT: u32 = 21;
const HEADER_ACTION: u8 = 0b000;
const HEADER_NAVIGATE: u8 = 0b001;
const HEADER_DIVE: u8 = 0b110;
const HEADER_TELEOP: u8 = 0b111;

const NAV_DISTANCE_MAX: u8 = 0x1F;
const NAV_TURN_MAX: i16 = 0xFF;
const TELEOP_AXIS_MAX: i8 = 0x7F;
const DIVE_DEPTH_MAX: u8 = 0x3F;
const ACTION_DEPTH_MAX: u8 = 0x3F;
const ACTION_DURATION_MAX: u16 = 0x1FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unrecognized header {0:#05b}")]
    UnknownHeader(u8),
    #[error("unrecognized action code {0}")]
    UnknownAction(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{field} = {value} does not fit its wire field")]
pub struct EncodeError {
    pub field: &'static str,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCode {
    StartMissionA,
    StartMissionB,
    Halt,
    CalibrateDepth,
    Abort,
    DownloadData,
}

impl ActionCode {
    pub fn to_u8(self) -> u8 {
        match self {
            ActionCode::StartMissionA => 0,
            ActionCode::StartMissionB => 1,
            ActionCode::Halt => 2,
            ActionCode::CalibrateDepth => 3,
            ActionCode::Abort => 4,
            ActionCode::DownloadData => 5,
        }
    }
}

impl TryFrom<u8> for ActionCode {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(ActionCode::StartMissionA),
            1 => Ok(ActionCode::StartMissionB),
            2 => Ok(ActionCode::Halt),
            3 => Ok(ActionCode::CalibrateDepth),
            4 => Ok(ActionCode::Abort),
            5 => Ok(ActionCode::DownloadData),
            other => Err(DecodeError::UnknownAction(other)),
        }
    }
}

/// Mission-start codes carry depth and duration; the others leave them zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub code: ActionCode,
    pub depth_m: u8,
    pub duration_s: u16,
}

impl Action {
    pub fn new(code: ActionCode) -> Self {
        Self { code, depth_m: 0, duration_s: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Ping,
    Navigate { distance_m: u8, turn_deg: i16 },
    Teleop { x: i8, y: i8, vertical: bool },
    Dive { target_depth_m: u8 },
    Action(Action),
}

/// Maps a checksum-verified payload to a command.
pub fn classify(payload: u32) -> Result<Command, DecodeError> {
    if payload == PING {
        return Ok(Command::Ping);
    }
    let payload = payload & PAYLOAD_MASK;
    let header = (payload >> HEADER_SHIFT) as u8;

    match header {
        HEADER_NAVIGATE => {
            let distance_m = ((payload >> 9) & 0x1F) as u8;
            let magnitude = (payload & 0xFF) as i16;
            let turn_deg = if payload & (1 << 8) != 0 { -magnitude } else { magnitude };
            Ok(Command::Navigate { distance_m, turn_deg })
        }
        HEADER_TELEOP => {
            let vertical = payload & (1 << 16) != 0;
            let x = signed_axis((payload >> 8) as u8);
            let y = signed_axis(payload as u8);
            Ok(Command::Teleop { x, y, vertical })
        }
        HEADER_DIVE => Ok(Command::Dive { target_depth_m: (payload & 0x3F) as u8 }),
        HEADER_ACTION => {
            let code = ActionCode::try_from((payload & 0b111) as u8)?;
            let action = match code {
                ActionCode::StartMissionA | ActionCode::StartMissionB => Action {
                    code,
                    duration_s: ((payload >> 3) & 0x1FF) as u16,
                    depth_m: ((payload >> 12) & 0x3F) as u8,
                },
                _ => Action::new(code),
            };
            Ok(Command::Action(action))
        }
        other => Err(DecodeError::UnknownHeader(other)),
    }
}

// sign bit 7, magnitude bits 6..0
fn signed_axis(byte: u8) -> i8 {
    let magnitude = (byte & 0x7F) as i8;
    if byte & 0x80 != 0 { -magnitude } else { magnitude }
}

fn axis_bits(field: &'static str, v: i8) -> Result<u32, EncodeError> {
    if v == i8::MIN || v.abs() > TELEOP_AXIS_MAX {
        return Err(EncodeError { field, value: v as i32 });
    }
    let sign = if v < 0 { 0x80 } else { 0 };
    Ok(sign | v.unsigned_abs() as u32)
}

fn check_range(field: &'static str, value: i32, max: i32) -> Result<u32, EncodeError> {
    if value < 0 || value > max {
        return Err(EncodeError { field, value });
    }
    Ok(value as u32)
}

impl Command {
    /// Inverse of [`classify`], used by base-station tooling.
    pub fn to_payload(&self) -> Result<u32, EncodeError> {
        let header = |h: u8| (h as u32) << HEADER_SHIFT;
        match *self {
            Command::Ping => Ok(PING),
            Command::Navigate { distance_m, turn_deg } => {
                let distance = check_range("distance_m", distance_m as i32, NAV_DISTANCE_MAX as i32)?;
                let magnitude = check_range("turn_deg", (turn_deg as i32).abs(), NAV_TURN_MAX as i32)?;
                let sign = if turn_deg < 0 { 1 << 8 } else { 0 };
                Ok(header(HEADER_NAVIGATE) | distance << 9 | sign | magnitude)
            }
            Command::Teleop { x, y, vertical } => {
                let v = if vertical { 1 << 16 } else { 0 };
                Ok(header(HEADER_TELEOP) | v | axis_bits("x", x)? << 8 | axis_bits("y", y)?)
            }
            Command::Dive { target_depth_m } => {
                let depth = check_range("target_depth_m", target_depth_m as i32, DIVE_DEPTH_MAX as i32)?;
                Ok(header(HEADER_DIVE) | depth)
            }
            Command::Action(a) => {
                let depth = check_range("depth_m", a.depth_m as i32, ACTION_DEPTH_MAX as i32)?;
                let duration = check_range("duration_s", a.duration_s as i32, ACTION_DURATION_MAX as i32)?;
                Ok(header(HEADER_ACTION) | depth << 12 | duration << 3 | a.code.to_u8() as u32)
            }
        }
    }
}
