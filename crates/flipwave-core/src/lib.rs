//! # Flipwave Core Library
//!
//! Frame encoder and serial driver for multi-panel flip-dot displays.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Panel layout loading and validation
//! - Bitmap to column-byte encoding per panel
//! - The panel wire protocol (start marker, command, screen id, payload, end marker)
//! - A serial transport and a queued, cancellable display driver
//!
//! ## Example
//!
//! ```rust,no_run
//! use flipwave_core::{config::DisplaySettings, driver::Driver};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), flipwave_core::FlipdotError> {
//! let settings = DisplaySettings::from_file(Path::new("FlipdotSettings.json"))?;
//! let mut driver = Driver::connect(&settings)?;
//!
//! let bitmap = vec![1; driver.layout().total_dot_count()];
//! driver.send_image(&bitmap)?.wait()?;
//!
//! driver.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod encoder;
mod error;
pub mod layout;
pub mod protocol;
pub mod transport;

pub use error::FlipdotError;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{DisplaySettings, Parity, SerialSettings};
    pub use crate::driver::{Driver, DriverState, SendHandle, SendReport};
    pub use crate::encoder::{encode, EncodedPanel};
    pub use crate::layout::{Panel, PanelDimension, PanelLayout};
    pub use crate::protocol::{frame, Command, Frame};
    pub use crate::transport::{Channel, SerialTransport};
    pub use crate::FlipdotError;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
