//! Protocol errors

use thiserror::Error;

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Failed to open serial port '{port}': {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Timed out waiting for a response line")]
    Timeout,

    #[error("Device rejected command '{command}'")]
    DeviceRejected { command: String },

    #[error("Could not decode response {payload:?} to '{command}': {reason}")]
    Decode {
        command: String,
        payload: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not connected to device")]
    NotConnected,

    #[error("Could not find any BioShake devices. Tried ports: {0}")]
    PortNotFound(String),

    #[error("Found more than one BioShake device: {0:?}. Specify a port.")]
    PortAmbiguous(Vec<String>),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// True when the device answered with the error sentinel
    pub fn is_device_rejection(&self) -> bool {
        matches!(self, ProtocolError::DeviceRejected { .. })
    }

    pub(crate) fn decode(command: &str, payload: &str, reason: impl ToString) -> Self {
        ProtocolError::Decode {
            command: command.to_string(),
            payload: payload.to_string(),
            reason: reason.to_string(),
        }
    }
}
