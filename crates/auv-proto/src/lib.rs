pub mod codec;
pub mod command;
pub mod telemetry;

pub use codec::{decode, encode, CodecError, Frame, DIVISOR, FRAME_LEN, PAYLOAD_MASK};
pub use command::{classify, Action, ActionCode, Command, DecodeError, EncodeError, PING};
pub use telemetry::Telemetry;
