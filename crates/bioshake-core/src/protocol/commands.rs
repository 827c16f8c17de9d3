//! Protocol commands
//!
//! Defines the commands understood by BioShake firmware.

/// Protocol commands for BioShake communication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Firmware version string
    GetVersion,

    /// Model information
    GetDescription,

    /// Restart the controller
    ResetDevice,

    /// Semicolon separated warnings and errors
    GetErrorList,

    /// Enter economical mode (no home position, ELM locked)
    SetEcoMode,

    /// Leave economical mode and find the home position
    LeaveEcoMode,

    /// Start shaking at the current target speed
    ShakeOn,

    /// Start shaking for a number of seconds (argument)
    ShakeOnWithRuntime,

    /// Remaining shake time in seconds
    GetShakeRemainingTime,

    /// Stop shaking and return home
    ShakeOff,

    /// High-speed stop, home position undefined
    ShakeEmergencyOff,

    /// Go to the home position and lock in
    ShakeGoHome,

    /// Shake state code
    GetShakeState,

    /// Target mixing speed in rpm
    GetShakeTargetSpeed,

    /// Set target mixing speed in rpm (argument)
    SetShakeTargetSpeed,
}

impl Command {
    /// Get the command name as sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetVersion => "getVersion",
            Command::GetDescription => "getDescription",
            Command::ResetDevice => "resetDevice",
            Command::GetErrorList => "getErrorList",
            Command::SetEcoMode => "setEcoMode",
            Command::LeaveEcoMode => "leaveEcoMode",
            Command::ShakeOn => "shakeOn",
            Command::ShakeOnWithRuntime => "shakeOnWithRuntime",
            Command::GetShakeRemainingTime => "getShakeRemainingTime",
            Command::ShakeOff => "shakeOff",
            Command::ShakeEmergencyOff => "shakeEmergencyOff",
            Command::ShakeGoHome => "shakeGoHome",
            Command::GetShakeState => "getShakeState",
            Command::GetShakeTargetSpeed => "getShakeTargetSpeed",
            Command::SetShakeTargetSpeed => "setShakeTargetSpeed",
        }
    }

    /// Check if this command carries a numeric argument
    pub fn takes_argument(&self) -> bool {
        matches!(
            self,
            Command::ShakeOnWithRuntime | Command::SetShakeTargetSpeed
        )
    }

    /// Check if a rejection of this command should trigger the
    /// set-default-speed-and-retry recovery
    pub fn starts_shaking(&self) -> bool {
        matches!(self, Command::ShakeOn | Command::ShakeOnWithRuntime)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
