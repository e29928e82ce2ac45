use thiserror::Error;

/// 33-bit generator the check value is computed against.
pub const DIVISOR: u64 = 0x1_04C1_1DB7;

/// On-air size of a frame: 3 payload bytes + 4 check bytes.
pub const FRAME_LEN: usize = 7;

pub const PAYLOAD_MASK: u32 = 0x00FF_FFFF;

const CHECK_BITS: u32 = 32;
const CHECK_LIMIT: u64 = 1 << CHECK_BITS;

pub type Frame = [u8; FRAME_LEN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("checksum invalid (frame value {0:#016x})")]
    ChecksumInvalid(u64),
    #[error("payload {0:#x} wider than 24 bits")]
    PayloadOverflow(u32),
    /// The integer check for this payload does not fit the 32-bit field, so no
    /// frame carrying it exists on the wire.
    #[error("payload {0:#08x} has no 32-bit codeword")]
    NoCodeword(u32),
}

/// Builds the 7-byte frame for a 24-bit payload.
///
/// `check = (DIVISOR - (payload << 32) mod DIVISOR) mod DIVISOR`, so the whole
/// 56-bit big-endian value is a multiple of [`DIVISOR`].
pub fn encode(payload: u32) -> Result<Frame, CodecError> {
    if payload & !PAYLOAD_MASK != 0 {
        return Err(CodecError::PayloadOverflow(payload));
    }
    let shifted = (payload as u64) << CHECK_BITS;
    let check = (DIVISOR - shifted % DIVISOR) % DIVISOR;
    if check >= CHECK_LIMIT {
        return Err(CodecError::NoCodeword(payload));
    }
    let value = shifted | check;

    let mut frame = [0u8; FRAME_LEN];
    frame.copy_from_slice(&value.to_be_bytes()[8 - FRAME_LEN..]);
    Ok(frame)
}

/// Verifies a frame and returns its payload.
pub fn decode(frame: &Frame) -> Result<u32, CodecError> {
    let value = frame_value(frame);
    if value % DIVISOR != 0 {
        return Err(CodecError::ChecksumInvalid(value));
    }
    Ok((value >> CHECK_BITS) as u32)
}

fn frame_value(frame: &Frame) -> u64 {
    let mut wide = [0u8; 8];
    wide[8 - FRAME_LEN..].copy_from_slice(frame);
    u64::from_be_bytes(wide)
}
