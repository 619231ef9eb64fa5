//! Serial port handling
//!
//! Opens the port the panels hang off with the configured line settings.

use serialport::SerialPort;

use crate::config::SerialSettings;
use crate::FlipdotError;

/// Open a serial port with the given line settings
pub fn open_port(settings: &SerialSettings) -> Result<Box<dyn SerialPort>, FlipdotError> {
    serialport::new(settings.port_name.as_str(), settings.baud_rate)
        .parity(settings.serial_parity()?)
        .data_bits(settings.serial_data_bits()?)
        .stop_bits(settings.serial_stop_bits()?)
        .flow_control(serialport::FlowControl::None)
        .timeout(settings.write_timeout())
        .open()
        .map_err(|e| open_error(&settings.port_name, e))
}

fn open_error(port_name: &str, e: serialport::Error) -> FlipdotError {
    match e.kind() {
        serialport::ErrorKind::NoDevice
        | serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
            FlipdotError::PortNotFound(port_name.to_string())
        }
        _ => FlipdotError::ConnectionFailed(format!("{}: {}", port_name, e)),
    }
}
