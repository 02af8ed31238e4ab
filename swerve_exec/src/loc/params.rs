//! Localisation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the pose estimator.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Pose the estimator starts at, `[x, y, heading]`.
    ///
    /// Units: meters, meters, radians
    pub initial_pose: [f64; 3],

    /// Fraction of the error to an observation that is removed per tick by a fully confident
    /// correction.
    pub max_correction_gain: f64,

    /// Observations below this confidence are ignored.
    pub min_correction_confidence: f64,

    /// Largest position change a single correction can apply.
    ///
    /// Units: meters
    pub max_correction_step_m: f64,

    /// Largest heading change a single correction can apply.
    ///
    /// Units: radians
    pub max_correction_step_rad: f64,

    /// Largest odometry displacement accepted in a single tick. Larger deltas are rejected as a
    /// sensor fault.
    ///
    /// Units: meters
    pub max_odom_step_m: f64,

    /// Largest gyro heading change accepted in a single tick.
    ///
    /// Units: radians
    pub max_odom_step_rad: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            initial_pose: [0.0, 0.0, 0.0],
            max_correction_gain: 0.2,
            min_correction_confidence: 0.05,
            max_correction_step_m: 0.05,
            max_correction_step_rad: 0.05,
            max_odom_step_m: 0.25,
            max_odom_step_rad: 0.5,
        }
    }
}
