//! Shake state reported by `getShakeState`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating condition of the shaking mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShakeState {
    /// Device answered with an empty payload (code -1)
    Unknown,
    /// Shaking is active (0)
    Shaking,
    /// Shaker has detected a stop command (1)
    StopCommandDetected,
    /// Braking (2)
    Braking,
    /// Arrived in the home position (3)
    Home,
    /// Manual mode (4)
    Manual,
    /// Accelerating (5)
    Accelerating,
    /// Decelerating (6)
    Decelerating,
    /// Decelerating with stopping (7)
    DeceleratingToStop,
    /// ECO mode (90)
    Eco,
    /// Boot process running (99)
    Booting,
}

impl ShakeState {
    /// Every state in code order
    pub const ALL: [ShakeState; 11] = [
        ShakeState::Unknown,
        ShakeState::Shaking,
        ShakeState::StopCommandDetected,
        ShakeState::Braking,
        ShakeState::Home,
        ShakeState::Manual,
        ShakeState::Accelerating,
        ShakeState::Decelerating,
        ShakeState::DeceleratingToStop,
        ShakeState::Eco,
        ShakeState::Booting,
    ];

    /// Numeric code as reported by the device
    pub fn code(&self) -> i32 {
        match self {
            ShakeState::Unknown => -1,
            ShakeState::Shaking => 0,
            ShakeState::StopCommandDetected => 1,
            ShakeState::Braking => 2,
            ShakeState::Home => 3,
            ShakeState::Manual => 4,
            ShakeState::Accelerating => 5,
            ShakeState::Decelerating => 6,
            ShakeState::DeceleratingToStop => 7,
            ShakeState::Eco => 90,
            ShakeState::Booting => 99,
        }
    }

    /// Fixed human readable description
    pub fn description(&self) -> &'static str {
        match self {
            ShakeState::Unknown => "",
            ShakeState::Shaking => "Shaking is active",
            ShakeState::StopCommandDetected => "Shaker has a stop command detect",
            ShakeState::Braking => "Shaker in the braking mode",
            ShakeState::Home => "Arrived in the home position",
            ShakeState::Manual => "Manual mode",
            ShakeState::Accelerating => "Acceleration",
            ShakeState::Decelerating => "Deceleration",
            ShakeState::DeceleratingToStop => "Deceleration with stopping",
            ShakeState::Eco => "ECO mode",
            ShakeState::Booting => "Boot process running",
        }
    }

    /// Look up a state by code. Codes outside the table return `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    /// Decode a trimmed `getShakeState` payload.
    ///
    /// An empty payload maps to [`ShakeState::Unknown`].
    pub fn from_payload(payload: &str) -> Result<Self, ShakeStateError> {
        if payload.is_empty() {
            return Ok(ShakeState::Unknown);
        }
        let code: i32 = payload
            .parse()
            .map_err(|_| ShakeStateError::NotAnInteger(payload.to_string()))?;
        Self::from_code(code).ok_or(ShakeStateError::UnknownCode(code))
    }
}

impl fmt::Display for ShakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

/// Why a shake state payload could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShakeStateError {
    #[error("shake state {0:?} is not an integer")]
    NotAnInteger(String),

    #[error("shake state code {0} is not defined")]
    UnknownCode(i32),
}

/// Code/description pair as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShakeStateReport {
    /// Numeric code
    pub value: i32,
    /// Fixed description for the code
    pub description: &'static str,
}

impl From<ShakeState> for ShakeStateReport {
    fn from(state: ShakeState) -> Self {
        Self {
            value: state.code(),
            description: state.description(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_table() {
        let expected = [
            (-1, ""),
            (0, "Shaking is active"),
            (1, "Shaker has a stop command detect"),
            (2, "Shaker in the braking mode"),
            (3, "Arrived in the home position"),
            (4, "Manual mode"),
            (5, "Acceleration"),
            (6, "Deceleration"),
            (7, "Deceleration with stopping"),
            (90, "ECO mode"),
            (99, "Boot process running"),
        ];
        for (code, description) in expected {
            let state = ShakeState::from_code(code).unwrap();
            assert_eq!(state.code(), code);
            assert_eq!(state.description(), description);
        }
    }

    #[test]
    fn test_payload_decoding() {
        assert_eq!(ShakeState::from_payload("0"), Ok(ShakeState::Shaking));
        assert_eq!(ShakeState::from_payload("90"), Ok(ShakeState::Eco));
        assert_eq!(ShakeState::from_payload("-1"), Ok(ShakeState::Unknown));
    }

    #[test]
    fn test_empty_payload_is_unknown() {
        assert_eq!(ShakeState::from_payload(""), Ok(ShakeState::Unknown));
    }

    #[test]
    fn test_out_of_table_code() {
        assert_eq!(
            ShakeState::from_payload("42"),
            Err(ShakeStateError::UnknownCode(42))
        );
        assert_eq!(ShakeState::from_code(8), None);
    }

    #[test]
    fn test_non_integer_payload() {
        assert!(matches!(
            ShakeState::from_payload("3.5"),
            Err(ShakeStateError::NotAnInteger(_))
        ));
        assert!(matches!(
            ShakeState::from_payload("busy"),
            Err(ShakeStateError::NotAnInteger(_))
        ));
    }

    #[test]
    fn test_report_serialization() {
        let report = ShakeStateReport::from(ShakeState::Home);
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"value":3,"description":"Arrived in the home position"}"#
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ShakeState::Eco.to_string(), "90 (ECO mode)");
    }
}
