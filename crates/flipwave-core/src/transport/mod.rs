//! Serial transport
//!
//! Owns the link to the panels. Writes take `&mut self`, so a transport can
//! only have one frame in flight; the driver hands it to a single worker.

mod channel;
pub mod serial;

pub use channel::{Channel, SerialChannel};
pub use serial::open_port;

use std::io::Write;
use tracing::{debug, error, info, warn};

use crate::config::SerialSettings;
use crate::FlipdotError;

/// Blocking, exclusive writer for encoded frames
pub struct SerialTransport {
    port_name: String,
    channel: Option<Box<dyn Channel>>,
    frames_written: u64,
    bytes_written: u64,
}

impl SerialTransport {
    /// Open the serial port described by `settings`.
    ///
    /// Fails with `PortNotFound` if the port does not exist and with
    /// `ConnectionFailed` if it cannot be opened, e.g. because another process
    /// holds it.
    pub fn open(settings: &SerialSettings) -> Result<Self, FlipdotError> {
        let port = open_port(settings)?;
        let mut channel = SerialChannel::new(port);
        if let Err(e) = channel.clear_output_buffer() {
            warn!(port = %settings.port_name, "could not clear output buffer: {}", e);
        }
        info!(
            port = %settings.port_name,
            baud = settings.baud_rate,
            "serial port opened"
        );
        Ok(Self::from_channel(settings.port_name.clone(), Box::new(channel)))
    }

    /// Wrap an already-open channel
    pub fn from_channel(port_name: impl Into<String>, channel: Box<dyn Channel>) -> Self {
        Self {
            port_name: port_name.into(),
            channel: Some(channel),
            frames_written: 0,
            bytes_written: 0,
        }
    }

    /// Write one complete frame, blocking until it is handed to the port
    pub fn write(&mut self, frame: &[u8]) -> Result<(), FlipdotError> {
        let channel = self.channel.as_mut().ok_or(FlipdotError::NotConnected)?;

        let result = channel.write_all(frame).and_then(|_| channel.flush());
        if let Err(e) = result {
            error!(port = %self.port_name, "frame write failed: {}", e);
            return Err(e.into());
        }

        self.frames_written += 1;
        self.bytes_written += frame.len() as u64;
        debug!(port = %self.port_name, len = frame.len(), "frame written");
        Ok(())
    }

    /// Release the port. Calling this more than once is harmless.
    pub fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.flush() {
                warn!(port = %self.port_name, "flush on close failed: {}", e);
            }
            info!(
                port = %self.port_name,
                frames = self.frames_written,
                bytes = self.bytes_written,
                "serial port closed"
            );
        }
    }

    /// Whether the port is still held
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Name the transport was opened with
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Cumulative (frames, bytes) written since open
    pub fn counters(&self) -> (u64, u64) {
        (self.frames_written, self.bytes_written)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port_name", &self.port_name)
            .field("open", &self.is_open())
            .field("frames_written", &self.frames_written)
            .field("bytes_written", &self.bytes_written)
            .finish()
    }
}
