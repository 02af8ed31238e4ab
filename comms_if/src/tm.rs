//! # Telemetry interface
//!
//! Components publish named values once per tick through a [`TelemetrySink`]. The transport
//! behind the sink is not the control core's concern; publishing failures are reported to the
//! caller which logs and drops them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A telemetry value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TmValue {
    Scalar(f64),
    Array(Vec<f64>),
    /// A pose as `[x_m, y_m, heading_rad]`
    Pose([f64; 3]),
    Flag(bool),
    Text(String),
}

/// Errors raised by telemetry sinks.
#[derive(Debug, thiserror::Error)]
pub enum TmError {
    #[error("Telemetry sink is not accepting values: {0}")]
    Unavailable(String),

    #[error("Could not write telemetry value {0}: {1}")]
    WriteFailed(String, String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Receiver of named telemetry values.
pub trait TelemetrySink {
    /// Publish a value under the given name.
    fn publish(&mut self, name: &str, value: TmValue) -> Result<(), TmError>;

    /// Called once at the end of each tick after all values have been published.
    fn end_tick(&mut self) -> Result<(), TmError> {
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmValue {
    /// Flatten the value into a list of numbers. Text flattens to nothing.
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            TmValue::Scalar(v) => vec![*v],
            TmValue::Array(a) => a.clone(),
            TmValue::Pose(p) => p.to_vec(),
            TmValue::Flag(f) => vec![if *f { 1.0 } else { 0.0 }],
            TmValue::Text(_) => vec![],
        }
    }
}
