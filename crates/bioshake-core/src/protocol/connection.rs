//! Connection management
//!
//! Handles the connection lifecycle and command execution with a BioShake
//! device. Every device operation goes through [`Bioshake::exchange`].

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;
use std::time::{Duration, Instant};

use super::{
    command_builder::{build_frame, command_text},
    Command, ProtocolError, SerialTransport, Transport, DEFAULT_BAUD_RATE,
    DEFAULT_SETTLE_DELAY_MS, DEFAULT_TARGET_SPEED, DEFAULT_TIMEOUT_MS,
    DEFAULT_WRITE_WRITE_DELAY_MS, ERROR_SENTINEL,
};
use crate::discovery;
use crate::shake_state::ShakeState;

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Explicit serial port; `None` runs port discovery
    pub port_name: Option<String>,
    /// Ports discovery is limited to; `None` probes every enumerated port
    pub try_ports: Option<Vec<String>>,
    /// Baud rate
    pub baud_rate: u32,
    /// Response line timeout in milliseconds
    pub timeout_ms: u64,
    /// Minimum spacing between writes in milliseconds
    pub write_write_delay_ms: u64,
    /// Wait after opening the port while the device reboots
    pub settle_delay_ms: u64,
    /// Trace every request and response at debug level
    pub debug: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: None,
            try_ports: None,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            write_write_delay_ms: DEFAULT_WRITE_WRITE_DELAY_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            debug: false,
        }
    }
}

impl ConnectionConfig {
    /// Default configuration bound to an explicit port
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: Some(port_name.into()),
            ..Self::default()
        }
    }

    /// Check values that would make the link unusable
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.baud_rate == 0 {
            return Err(ProtocolError::InvalidConfig(
                "baud_rate must be greater than zero".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ProtocolError::InvalidConfig(
                "timeout_ms must be greater than zero".into(),
            ));
        }
        if matches!(self.port_name.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(ProtocolError::InvalidConfig(
                "port_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ProtocolError> {
        let config: ConnectionConfig = serde_json::from_str(json)
            .map_err(|e| ProtocolError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Response line timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Minimum spacing between writes
    pub fn write_spacing(&self) -> Duration {
        Duration::from_millis(self.write_write_delay_ms)
    }

    /// Delay after port open
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// BioShake device driver.
///
/// Owns its transport exclusively. Every call blocks for the write (subject
/// to the write spacing) and the response read (subject to the timeout).
/// Callers sharing a device across threads must wrap the driver in a mutex.
pub struct Bioshake<T: Transport = SerialTransport> {
    transport: T,
    port_name: String,
    config: ConnectionConfig,
}

impl Bioshake<SerialTransport> {
    /// Open a device.
    ///
    /// Uses `config.port_name` when set, otherwise discovers the single
    /// attached device among `config.try_ports` (or all ports). Blocks for the settle delay after opening the port.
    pub fn open(config: ConnectionConfig) -> Result<Self, ProtocolError> {
        config.validate()?;

        let port_name = match &config.port_name {
            Some(port) => port.clone(),
            None => discovery::find_device_port(&config, config.try_ports.as_deref())?,
        };

        let start = Instant::now();
        let transport = SerialTransport::open(&port_name, config.baud_rate, config.write_spacing())?;

        // The device reboots when the line opens and ignores commands meanwhile
        std::thread::sleep(config.settle_delay());
        tracing::info!(
            "Opened BioShake on '{}' in {}ms",
            port_name,
            start.elapsed().as_millis()
        );

        Ok(Self {
            transport,
            port_name,
            config,
        })
    }

    /// Open a device, run `f`, and close the device on every exit path
    pub fn scoped<R, F>(config: ConnectionConfig, f: F) -> Result<R, ProtocolError>
    where
        F: FnOnce(&mut Self) -> Result<R, ProtocolError>,
    {
        let mut device = Self::open(config)?;
        let result = f(&mut device);
        device.close();
        result
    }
}

impl<T: Transport> Bioshake<T> {
    /// Drive a device over an already open transport. No settle delay.
    pub fn with_transport(transport: T, config: ConnectionConfig) -> Self {
        let port_name = config.port_name.clone().unwrap_or_default();
        Self {
            transport,
            port_name,
            config,
        }
    }

    /// Port the device is attached to
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Active configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether the transport is still open
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Release the transport. Safe to call more than once.
    pub fn close(&mut self) {
        if self.transport.is_open() {
            self.transport.close();
            tracing::info!("Closed BioShake on '{}'", self.port_name);
        }
    }

    /// Send one request and return the trimmed response payload.
    ///
    /// Fails with [`ProtocolError::DeviceRejected`] when the device answers
    /// with the error sentinel.
    pub fn exchange(&mut self, command: &str, args: &[&dyn Display]) -> Result<String, ProtocolError> {
        let frame = build_frame(command, args);
        let request = command_text(&frame);
        if self.config.debug {
            tracing::debug!("request {:?}", request);
        } else {
            tracing::trace!("request {:?}", request);
        }

        self.transport.discard_input()?;
        self.transport.write(&frame)?;
        let line = self.transport.read_line(self.config.read_timeout())?;
        let response = String::from_utf8_lossy(&line).trim().to_string();

        if self.config.debug {
            tracing::debug!("response {:?}", response);
        } else {
            tracing::trace!("response {:?}", response);
        }

        if response == ERROR_SENTINEL {
            return Err(ProtocolError::DeviceRejected { command: request });
        }
        Ok(response)
    }

    fn send(&mut self, command: Command) -> Result<String, ProtocolError> {
        debug_assert!(!command.takes_argument());
        self.exchange(command.name(), &[])
    }

    fn send_with(&mut self, command: Command, arg: u32) -> Result<String, ProtocolError> {
        debug_assert!(command.takes_argument());
        self.exchange(command.name(), &[&arg])
    }

    /// Start shaking, recovering once from an unset target speed.
    ///
    /// After power-up the device rejects shake commands until a target speed
    /// has been set. On rejection the default speed is sent (its outcome is
    /// ignored) and the original command is retried exactly once.
    fn start_shaking(&mut self, command: Command, args: &[&dyn Display]) -> Result<String, ProtocolError> {
        debug_assert!(command.starts_shaking());
        match self.exchange(command.name(), args) {
            Err(ProtocolError::DeviceRejected { command: rejected }) => {
                tracing::warn!(
                    "'{}' rejected, setting target speed {} rpm and retrying once",
                    rejected,
                    DEFAULT_TARGET_SPEED
                );
                if let Err(e) = self.set_default_shake_target_speed() {
                    tracing::debug!("ignoring failed target speed reset: {}", e);
                }
                self.exchange(command.name(), args)
            }
            other => other,
        }
    }

    /// Current firmware version
    pub fn get_version(&mut self) -> Result<String, ProtocolError> {
        self.send(Command::GetVersion)
    }

    /// Current model information
    pub fn get_description(&mut self) -> Result<String, ProtocolError> {
        self.send(Command::GetDescription)
    }

    /// Restart the controller
    pub fn reset_device(&mut self) -> Result<String, ProtocolError> {
        self.send(Command::ResetDevice)
    }

    /// Semicolon separated list of warnings and errors, as sent by the device
    pub fn get_error_list(&mut self) -> Result<String, ProtocolError> {
        self.send(Command::GetErrorList)
    }

    /// Warnings and errors split into entries
    pub fn get_errors(&mut self) -> Result<Vec<String>, ProtocolError> {
        let list = self.get_error_list()?;
        Ok(list
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(String::from)
            .collect())
    }

    /// Switch to economical mode.
    ///
    /// Turns off the home position solenoid and locks the ELM: the shaker
    /// has no home position afterwards.
    pub fn set_eco_mode(&mut self) -> Result<String, ProtocolError> {
        self.send(Command::SetEcoMode)
    }

    /// Leave economical mode and find the home position
    pub fn leave_eco_mode(&mut self) -> Result<String, ProtocolError> {
        self.send(Command::LeaveEcoMode)
    }

    /// Start shaking at the current target speed, or the default speed if
    /// none was set since power-up
    pub fn shake_on(&mut self) -> Result<String, ProtocolError> {
        self.start_shaking(Command::ShakeOn, &[])
    }

    /// Start shaking for `seconds` (device range 0-99999)
    pub fn shake_on_with_runtime(&mut self, seconds: u32) -> Result<String, ProtocolError> {
        self.start_shaking(Command::ShakeOnWithRuntime, &[&seconds])
    }

    /// Remaining shake time
    pub fn get_shake_remaining_time(&mut self) -> Result<Duration, ProtocolError> {
        let command = Command::GetShakeRemainingTime;
        let payload = self.send(command)?;
        let seconds: f64 = payload
            .parse()
            .map_err(|e| ProtocolError::decode(command.name(), &payload, e))?;
        Duration::try_from_secs_f64(seconds)
            .map_err(|e| ProtocolError::decode(command.name(), &payload, e))
    }

    /// Stop shaking and return to the home position
    pub fn shake_off(&mut self) -> Result<String, ProtocolError> {
        self.send(Command::ShakeOff)
    }

    /// High-speed stop. The home position is undefined afterwards.
    pub fn shake_emergency_off(&mut self) -> Result<String, ProtocolError> {
        self.send(Command::ShakeEmergencyOff)
    }

    /// Go to the home position and lock in
    pub fn shake_go_home(&mut self) -> Result<String, ProtocolError> {
        self.send(Command::ShakeGoHome)
    }

    /// Current shake state
    pub fn get_shake_state(&mut self) -> Result<ShakeState, ProtocolError> {
        let command = Command::GetShakeState;
        let payload = self.send(command)?;
        ShakeState::from_payload(&payload)
            .map_err(|e| ProtocolError::decode(command.name(), &payload, e))
    }

    /// Target mixing speed in rpm
    pub fn get_shake_target_speed(&mut self) -> Result<f64, ProtocolError> {
        let command = Command::GetShakeTargetSpeed;
        let payload = self.send(command)?;
        let rpm: f64 = payload
            .parse()
            .map_err(|e| ProtocolError::decode(command.name(), &payload, e))?;
        if !rpm.is_finite() {
            return Err(ProtocolError::decode(
                command.name(),
                &payload,
                "target speed must be a finite number",
            ));
        }
        Ok(rpm)
    }

    /// Set the target mixing speed in rpm (device range 0-3000)
    pub fn set_shake_target_speed(&mut self, rpm: u32) -> Result<String, ProtocolError> {
        self.send_with(Command::SetShakeTargetSpeed, rpm)
    }

    /// Set the target mixing speed to the default 1000 rpm
    pub fn set_default_shake_target_speed(&mut self) -> Result<String, ProtocolError> {
        self.set_shake_target_speed(DEFAULT_TARGET_SPEED)
    }
}

impl<T: Transport> Drop for Bioshake<T> {
    fn drop(&mut self) {
        self.close();
    }
}
