//! Protocol commands
//!
//! The panel controllers pick the display mode from the command byte. Each
//! command is tied to one payload size, i.e. one panel width.

use serde::{Deserialize, Serialize};

/// Display commands understood by the panel controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// 112 columns, buffered (no refresh)
    Write112,

    /// 112 columns, redraw immediately
    Refresh112,

    /// 28 columns, redraw immediately
    Refresh28,

    /// 28 columns, buffered (no refresh)
    Write28,

    /// 56 columns, redraw immediately
    Refresh56,

    /// 56 columns, buffered (no refresh)
    Write56,
}

impl Command {
    /// Panel widths that have a command
    pub const SUPPORTED_WIDTHS: [usize; 3] = [28, 56, 112];

    /// Select the command for a payload of `len` bytes.
    ///
    /// Returns `None` for lengths the controllers have no command for.
    pub fn for_payload(len: usize, refresh: bool) -> Option<Self> {
        let command = match (len, refresh) {
            (112, true) => Command::Refresh112,
            (112, false) => Command::Write112,
            (28, true) => Command::Refresh28,
            (28, false) => Command::Write28,
            (56, true) => Command::Refresh56,
            (56, false) => Command::Write56,
            _ => return None,
        };
        Some(command)
    }

    /// Get the command byte
    pub fn byte(&self) -> u8 {
        match self {
            Command::Write112 => 0x81,
            Command::Refresh112 => 0x82,
            Command::Refresh28 => 0x83,
            Command::Write28 => 0x84,
            Command::Refresh56 => 0x85,
            Command::Write56 => 0x86,
        }
    }

    /// Payload length this command expects
    pub fn payload_len(&self) -> usize {
        match self {
            Command::Write112 | Command::Refresh112 => 112,
            Command::Refresh28 | Command::Write28 => 28,
            Command::Refresh56 | Command::Write56 => 56,
        }
    }

    /// Whether the panel redraws as soon as the frame arrives
    pub fn refreshes(&self) -> bool {
        matches!(
            self,
            Command::Refresh112 | Command::Refresh28 | Command::Refresh56
        )
    }
}
