//! Display settings
//!
//! Loads the JSON settings file describing the serial link and the panel
//! layout. Keys are camelCase, e.g.:
//!
//! ```json
//! {
//!   "comPort": "/dev/ttyUSB0",
//!   "baudRate": 57600,
//!   "parity": "none",
//!   "dataBits": 8,
//!   "stopBits": 1,
//!   "lineStride": 28,
//!   "panels": [
//!     { "startX": 0, "startY": 0, "width": 28, "height": 7 },
//!     { "startX": 0, "startY": 7, "width": 28, "height": 7 }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::layout::{PanelDimension, PanelLayout};
use crate::FlipdotError;

/// Default baud rate of the panel controllers
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Default bound on a single blocking write, in milliseconds
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;

/// Serial parity.
///
/// Read either by name (`"none"`, `"odd"`, ...) or by its numeric index
/// (`0` = none, `1` = odd, `2` = even, `3` = mark, `4` = space), as older
/// settings files store it. Mark and space parse but cannot be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "ParityValue")]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
    /// Parity bit always set
    Mark,
    /// Parity bit always clear
    Space,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParityValue {
    Index(u64),
    Name(String),
}

impl TryFrom<ParityValue> for Parity {
    type Error = String;

    fn try_from(value: ParityValue) -> Result<Self, Self::Error> {
        match value {
            ParityValue::Index(0) => Ok(Parity::None),
            ParityValue::Index(1) => Ok(Parity::Odd),
            ParityValue::Index(2) => Ok(Parity::Even),
            ParityValue::Index(3) => Ok(Parity::Mark),
            ParityValue::Index(4) => Ok(Parity::Space),
            ParityValue::Index(n) => Err(format!("unknown parity {}", n)),
            ParityValue::Name(name) => match name.to_ascii_lowercase().as_str() {
                "none" => Ok(Parity::None),
                "odd" => Ok(Parity::Odd),
                "even" => Ok(Parity::Even),
                "mark" => Ok(Parity::Mark),
                "space" => Ok(Parity::Space),
                _ => Err(format!("unknown parity '{}'", name)),
            },
        }
    }
}

/// Serial link parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub port_name: String,
    /// Line speed
    pub baud_rate: u32,
    /// Parity
    pub parity: Parity,
    /// Data bits per character (5 to 8)
    pub data_bits: u8,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
    /// Bound on a single blocking write
    pub write_timeout_ms: u64,
}

impl SerialSettings {
    /// 8N1 at the default baud rate
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::None,
            data_bits: 8,
            stop_bits: 1,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }

    /// Parity as the serial backend understands it
    pub fn serial_parity(&self) -> Result<serialport::Parity, FlipdotError> {
        match self.parity {
            Parity::None => Ok(serialport::Parity::None),
            Parity::Odd => Ok(serialport::Parity::Odd),
            Parity::Even => Ok(serialport::Parity::Even),
            Parity::Mark | Parity::Space => Err(FlipdotError::config(format!(
                "unsupported parity {:?}",
                self.parity
            ))),
        }
    }

    /// Data bits as the serial backend understands them
    pub fn serial_data_bits(&self) -> Result<serialport::DataBits, FlipdotError> {
        match self.data_bits {
            5 => Ok(serialport::DataBits::Five),
            6 => Ok(serialport::DataBits::Six),
            7 => Ok(serialport::DataBits::Seven),
            8 => Ok(serialport::DataBits::Eight),
            n => Err(FlipdotError::config(format!("unsupported dataBits {}", n))),
        }
    }

    /// Stop bits as the serial backend understands them
    pub fn serial_stop_bits(&self) -> Result<serialport::StopBits, FlipdotError> {
        match self.stop_bits {
            1 => Ok(serialport::StopBits::One),
            2 => Ok(serialport::StopBits::Two),
            n => Err(FlipdotError::config(format!("unsupported stopBits {}", n))),
        }
    }

    /// Write timeout as a duration
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Complete settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    /// Serial port the panels hang off
    pub com_port: String,
    /// Panels in screen id order
    pub panels: Vec<PanelDimension>,
    /// Line speed
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Parity, by name or numeric index
    #[serde(default)]
    pub parity: Parity,
    /// Data bits per character
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Stop bits
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Dots per bitmap row
    pub line_stride: usize,
    /// Bitmap rows, when the renderer has a fixed resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    /// Bound on a single blocking write, in milliseconds
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_write_timeout_ms() -> u64 {
    DEFAULT_WRITE_TIMEOUT_MS
}

impl DisplaySettings {
    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, FlipdotError> {
        let settings: DisplaySettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, FlipdotError> {
        let content = fs::read_to_string(path).map_err(|e| {
            FlipdotError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Build the validated panel layout
    pub fn layout(&self) -> Result<PanelLayout, FlipdotError> {
        PanelLayout::new(&self.panels, self.line_stride, self.rows)
    }

    /// Serial link parameters
    pub fn serial(&self) -> SerialSettings {
        SerialSettings {
            port_name: self.com_port.clone(),
            baud_rate: self.baud_rate,
            parity: self.parity,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            write_timeout_ms: self.write_timeout_ms,
        }
    }

    fn validate(&self) -> Result<(), FlipdotError> {
        if self.com_port.trim().is_empty() {
            return Err(FlipdotError::config("comPort is empty"));
        }
        if self.baud_rate == 0 {
            return Err(FlipdotError::config("baudRate must be positive"));
        }
        let serial = self.serial();
        serial.serial_parity()?;
        serial.serial_data_bits()?;
        serial.serial_stop_bits()?;
        self.layout()?;
        Ok(())
    }
}
