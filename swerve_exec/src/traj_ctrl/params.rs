//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::TrajConstraints;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Translation (x and y) controller proportional gain
    pub trans_k_p: f64,

    /// Translation controller integral gain
    pub trans_k_i: f64,

    /// Translation controller derivative gain
    pub trans_k_d: f64,

    /// Heading controller proportional gain
    pub head_k_p: f64,

    /// Heading controller integral gain
    pub head_k_i: f64,

    /// Heading controller derivative gain
    pub head_k_d: f64,

    /// Distance from the end pose within which the trajectory counts as complete.
    ///
    /// Units: meters
    pub pos_tolerance_m: f64,

    /// Heading error from the end pose within which the trajectory counts as complete.
    ///
    /// Units: radians
    pub heading_tolerance_rad: f64,

    /// If false the follower finishes as soon as the trajectory time is exhausted.
    pub require_end_tolerance: bool,

    /// Time allowed after the trajectory ends to settle within tolerance before the follower
    /// gives up and finishes anyway.
    ///
    /// Units: seconds
    pub max_overrun_s: f64,

    /// Constraints for trajectories generated on the fly.
    pub on_the_fly: TrajConstraints,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            trans_k_p: 5.0,
            trans_k_i: 0.0,
            trans_k_d: 0.0,
            head_k_p: 5.0,
            head_k_i: 0.0,
            head_k_d: 0.0,
            pos_tolerance_m: 0.05,
            heading_tolerance_rad: 0.05,
            require_end_tolerance: true,
            max_overrun_s: 2.0,
            on_the_fly: TrajConstraints {
                max_vel_ms: 3.0,
                max_accel_mss: 3.0,
                max_ang_vel_rads: 6.0,
                max_ang_accel_radss: 12.0,
            },
        }
    }
}
