//! Downlink (vehicle -> base station) telemetry payloads.
//!
//! All use the same 7-byte framing as commands. Fixed-point fields saturate
//! rather than wrap.

use serde::{Deserialize, Serialize};

use crate::command::DecodeError;

const HEADER_SHIFT: u32 = 21;
const HEADER_POSITION: u32 = 0b000;
const HEADER_HEADING: u32 = 0b001;
const HEADER_MISC: u32 = 0b010;
const HEADER_DEPTH: u32 = 0b011;

const POSITION_MAX: i16 = 0x1FF;
const TEMPERATURE_MAX: i8 = 0x3F;
const DEPTH_WHOLE_MAX: u32 = 0x1_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Telemetry {
    /// Dead-reckoned position in metres from the maneuver origin.
    Position { x: i16, y: i16 },
    /// Compass heading, two decimals.
    Heading { deg: f64 },
    /// Hull temperature in whole degrees plus 5 status flag bits.
    Misc { temperature_c: i8, flags: u8 },
    /// Depth in metres, one decimal.
    Depth { m: f64 },
}

impl Telemetry {
    pub fn to_payload(&self) -> u32 {
        match *self {
            Telemetry::Position { x, y } => {
                HEADER_POSITION << HEADER_SHIFT | position_bits(x) << 10 | position_bits(y)
            }
            Telemetry::Heading { deg } => {
                let (whole, hundredths) = split_fixed(deg.rem_euclid(360.0), 100.0);
                let whole = whole.min(359);
                HEADER_HEADING << HEADER_SHIFT | whole << 7 | hundredths
            }
            Telemetry::Misc { temperature_c, flags } => {
                let sign = if temperature_c < 0 { 1 << 11 } else { 0 };
                let whole = (temperature_c as i16).abs().min(TEMPERATURE_MAX as i16) as u32;
                HEADER_MISC << HEADER_SHIFT | sign | whole << 5 | (flags & 0x1F) as u32
            }
            Telemetry::Depth { m } => {
                let (whole, tenths) = split_fixed(m.max(0.0), 10.0);
                HEADER_DEPTH << HEADER_SHIFT | whole.min(DEPTH_WHOLE_MAX) << 4 | tenths
            }
        }
    }

    /// Base-station side parse of a verified downlink payload.
    pub fn from_payload(payload: u32) -> Result<Self, DecodeError> {
        let header = (payload >> HEADER_SHIFT) & 0b111;
        match header {
            HEADER_POSITION => Ok(Telemetry::Position {
                x: position_from_bits(payload >> 10),
                y: position_from_bits(payload),
            }),
            HEADER_HEADING => {
                let whole = (payload >> 7) & 0x1FF;
                let hundredths = payload & 0x7F;
                Ok(Telemetry::Heading { deg: whole as f64 + hundredths as f64 / 100.0 })
            }
            HEADER_MISC => {
                let whole = ((payload >> 5) & 0x3F) as i8;
                let temperature_c = if payload & (1 << 11) != 0 { -whole } else { whole };
                Ok(Telemetry::Misc { temperature_c, flags: (payload & 0x1F) as u8 })
            }
            HEADER_DEPTH => {
                let whole = (payload >> 4) & DEPTH_WHOLE_MAX;
                let tenths = payload & 0xF;
                Ok(Telemetry::Depth { m: whole as f64 + tenths as f64 / 10.0 })
            }
            other => Err(DecodeError::UnknownHeader(other as u8)),
        }
    }
}

// Splits a non-negative value into whole units and rounded fractional steps,
// carrying into the whole part when the fraction rounds up to a full unit.
fn split_fixed(v: f64, steps: f64) -> (u32, u32) {
    let whole = v.trunc();
    let mut frac = ((v - whole) * steps).round();
    let mut whole = whole as u32;
    if frac >= steps {
        whole += 1;
        frac = 0.0;
    }
    (whole, frac as u32)
}

fn position_bits(v: i16) -> u32 {
    let magnitude = v.unsigned_abs().min(POSITION_MAX as u16) as u32;
    let sign = if v < 0 { 1 << 9 } else { 0 };
    sign | magnitude
}

fn position_from_bits(bits: u32) -> i16 {
    let magnitude = (bits & 0x1FF) as i16;
    if bits & (1 << 9) != 0 { -magnitude } else { magnitude }
}
