//! Serial Protocol Communication
//!
//! Implements the BioShake line-oriented ASCII protocol.
//!
//! Requests are `<command><args>\r`; the device answers one line per request,
//! either a payload or the single character `e` when it rejects the command.

pub mod command_builder;
pub mod commands;
mod connection;
mod error;
pub mod serial;
mod transport;

pub use command_builder::{build_frame, command_text};
pub use commands::Command;
pub use connection::{Bioshake, ConnectionConfig};
pub use error::ProtocolError;
pub use serial::{
    clear_buffers, configure_port, list_ports, open_port, LinePort, PortInfo, SerialTransport,
};
pub use transport::{Transport, WriteThrottle};

/// Default baud rate for BioShake communication
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default timeout for a response line in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 50;

/// Default minimum spacing between writes in milliseconds
pub const DEFAULT_WRITE_WRITE_DELAY_MS: u64 = 50;

/// Delay after opening the port while the device boots, in milliseconds
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

/// Target speed sent before retrying a rejected shake command, in rpm
pub const DEFAULT_TARGET_SPEED: u32 = 1000;

/// Response payload signalling that the device rejected the last command
pub const ERROR_SENTINEL: &str = "e";
