//! Driver errors

use thiserror::Error;

/// Errors that can occur while configuring, encoding for, or talking to a display
#[derive(Error, Debug)]
pub enum FlipdotError {
    /// Invalid settings or panel geometry
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Settings file is not valid JSON for the settings schema
    #[error("Failed to parse display settings: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The serial port exists but could not be opened
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The serial port does not exist
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// The driver or transport is closed
    #[error("Not connected to display")]
    NotConnected,

    /// Bitmap does not hold exactly one value per panel dot
    #[error("Bitmap length mismatch: expected {expected} dots, got {actual}")]
    BitmapLength {
        /// Dots the layout expects
        expected: usize,
        /// Values in the bitmap
        actual: usize,
    },

    /// The send was cancelled before it completed
    #[error("Send cancelled by shutdown")]
    Cancelled,

    /// Writing to the port failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FlipdotError {
    /// True for errors caused by a bad bitmap; the frame can be dropped and the
    /// next one sent normally.
    pub fn is_validation(&self) -> bool {
        matches!(self, FlipdotError::BitmapLength { .. })
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        FlipdotError::Configuration(msg.into())
    }
}
