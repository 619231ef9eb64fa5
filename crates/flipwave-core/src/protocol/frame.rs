//! Frame encoding
//!
//! Frame format:
//! - 1 byte: Start marker (0x80)
//! - 1 byte: Command (see [`Command`]), 0x00 when the payload size has none
//! - 1 byte: Screen id (1-based panel index)
//! - N bytes: Column payload
//! - 1 byte: End marker (0x8F)

use tracing::warn;

use super::{Command, FRAME_END, FRAME_OVERHEAD, FRAME_START, INVALID_COMMAND};

/// One protocol message for one panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Target screen
    pub screen_id: u8,
    /// Command byte actually sent
    pub command: u8,
    /// Column payload
    pub payload: Vec<u8>,
    /// Whether a refresh command was requested
    pub refresh: bool,
}

impl Frame {
    /// Create a frame, picking the command from the payload length
    pub fn new(screen_id: u8, payload: Vec<u8>, refresh: bool) -> Self {
        let command = match Command::for_payload(payload.len(), refresh) {
            Some(cmd) => cmd.byte(),
            None => {
                warn!(
                    screen_id,
                    len = payload.len(),
                    "no command for payload length, sending 0x00"
                );
                INVALID_COMMAND
            }
        };
        Self {
            screen_id,
            command,
            payload,
            refresh,
        }
    }

    /// Whether the controllers know the command byte
    pub fn has_valid_command(&self) -> bool {
        self.command != INVALID_COMMAND
    }

    /// Encode the frame to raw bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_size());
        bytes.push(FRAME_START);
        bytes.push(self.command);
        bytes.push(self.screen_id);
        bytes.extend_from_slice(&self.payload);
        bytes.push(FRAME_END);
        bytes
    }

    /// Get the total encoded size
    pub fn encoded_size(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }
}

/// Wrap `payload` for `screen_id` into a wire frame.
pub fn frame(screen_id: u8, payload: &[u8], refresh: bool) -> Vec<u8> {
    Frame::new(screen_id, payload.to_vec(), refresh).to_bytes()
}

/// [`frame`] with the default refresh behaviour (redraw immediately).
pub fn frame_refresh(screen_id: u8, payload: &[u8]) -> Vec<u8> {
    frame(screen_id, payload, true)
}
