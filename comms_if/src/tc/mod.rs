//! # Telecommand module
//!
//! Telecommands are the instructions an operator (or an operator script) sends to the robot:
//! mode changes, autonomous routine selection, and joystick input snapshots.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod input;
pub use input::*;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use serde_json::{self, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Tc {
    /// Put the robot into safe mode, cancelling all actions.
    MakeSafe,

    /// Clear a safe mode entered by `MakeSafe`.
    MakeUnsafe,

    /// Switch the robot operating mode.
    SetMode(RobotMode),

    /// Select the autonomous routine by name.
    SelectRoutine(String),

    /// A new snapshot of the operator's controller.
    Input(OperatorInput),
}

/// Operating modes of the robot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobotMode {
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0} is expected to have a payload but it doesn't")]
    MissingPayload(String),

    #[error("TC of type {0} has an invalid payload: {1}")]
    InvalidPayload(String, serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet of the form
    /// `{"type": "<TYPE>", "payload": <payload>}`.
    ///
    /// Types are `SAFE`, `UNSAFE` (no payload), `MODE` (a `RobotMode` name),
    /// `ROUTINE` (a routine name) and `INPUT` (an `OperatorInput` object).
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse the JSON string into a value
        let val: Value = serde_json::from_str(json_str)
            .map_err(TcParseError::InvalidJson)?;

        // Get the type of the TC
        let tc_type = match val["type"].as_str() {
            Some(s) => s.to_string(),
            None => return Err(TcParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };

        let payload = &val["payload"];

        match tc_type.clone().as_str() {
            "SAFE" => Ok(Tc::MakeSafe),
            "UNSAFE" => Ok(Tc::MakeUnsafe),
            "MODE" | "ROUTINE" | "INPUT" if payload.is_null() => 
                Err(TcParseError::MissingPayload(tc_type)),
            "MODE" => serde_json::from_value(payload.clone())
                .map(Tc::SetMode)
                .map_err(|e| TcParseError::InvalidPayload(tc_type, e)),
            "ROUTINE" => serde_json::from_value(payload.clone())
                .map(Tc::SelectRoutine)
                .map_err(|e| TcParseError::InvalidPayload(tc_type, e)),
            "INPUT" => serde_json::from_value(payload.clone())
                .map(Tc::Input)
                .map_err(|e| TcParseError::InvalidPayload(tc_type, e)),
            _ => Err(TcParseError::InvalidType(
                format!("{} is not a recognised TC type", tc_type)
            ))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_tcs() {
        assert!(matches!(Tc::from_json(r#"{"type": "SAFE"}"#), Ok(Tc::MakeSafe)));
        assert!(matches!(
            Tc::from_json(r#"{"type": "MODE", "payload": "Teleop"}"#),
            Ok(Tc::SetMode(RobotMode::Teleop))
        ));

        match Tc::from_json(r#"{"type": "INPUT", "payload": {"left_y": -0.5, "buttons": {"a": true}}}"#) {
            Ok(Tc::Input(i)) => {
                assert_eq!(i.left_y, -0.5);
                assert_eq!(i.right_x, 0.0);
                assert!(i.buttons.a);
                assert!(!i.buttons.y);
            },
            other => panic!("Unexpected parse result {:?}", other)
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Tc::from_json(r#"{"type": "MODE"}"#),
            Err(TcParseError::MissingPayload(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "FLY"}"#),
            Err(TcParseError::InvalidType(_))
        ));
        assert!(matches!(
            Tc::from_json("not json"),
            Err(TcParseError::InvalidJson(_))
        ));
    }
}
