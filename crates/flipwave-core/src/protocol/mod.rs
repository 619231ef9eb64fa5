//! Panel wire protocol
//!
//! Every panel update is one fixed-layout frame: start marker, command byte,
//! screen id, column payload, end marker. There is no length field or checksum;
//! the command byte implies the payload size.

pub mod commands;
pub mod frame;

pub use commands::Command;
pub use frame::{frame, frame_refresh, Frame};

/// First byte of every frame
pub const FRAME_START: u8 = 0x80;

/// Last byte of every frame
pub const FRAME_END: u8 = 0x8F;

/// Command byte sent when the payload size has no command
pub const INVALID_COMMAND: u8 = 0x00;

/// Bytes a frame adds around its payload
pub const FRAME_OVERHEAD: usize = 4;
