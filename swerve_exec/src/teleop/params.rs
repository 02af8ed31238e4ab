//! Teleop parameters

use serde::Deserialize;

/// Parameters for operator driving.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Translation stick values with a magnitude at or below this are zeroed.
    pub translation_deadzone: f64,

    /// Rotation stick values with a magnitude at or below this are zeroed.
    pub rotation_deadzone: f64,

    /// Fraction of the maximum translation speed available without boost.
    pub translation_gain: f64,

    /// Fraction of the maximum rotation rate available to the operator.
    pub rotation_gain: f64,

    /// Use closed loop velocity control for the default teleop drive.
    pub closed_loop: bool,

    /// Rotation stick magnitude above which the operator takes back heading control from a lock
    /// or focus action.
    pub override_threshold: f64,

    /// Field pose the drive to pose binding aims for, `[x, y, heading]`.
    ///
    /// Units: meters, meters, radians
    pub drive_to_pose: [f64; 3],
}

impl Default for Params {
    fn default() -> Self {
        Self {
            translation_deadzone: 0.1,
            rotation_deadzone: 0.1,
            translation_gain: 0.6,
            rotation_gain: 0.8,
            closed_loop: false,
            override_threshold: 0.2,
            drive_to_pose: [4.0, 4.0, 0.0],
        }
    }
}
