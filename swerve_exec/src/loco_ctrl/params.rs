//! Parameters structure for LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::swerve::NUM_MODULES;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Locomotion control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- GEOMETRY ----

    /// The position of each module's steer axis in the chassis frame, in the order front left,
    /// front right, back left, back right.
    ///
    /// Units: meters,
    /// Frame: Chassis
    pub module_pos_m_rb: [[f64; 2]; NUM_MODULES],

    // ---- CAPABILITIES ----

    /// Maximum ground speed of a single wheel.
    ///
    /// Units: meters/second
    pub max_wheel_speed_ms: f64,

    /// Maximum translational speed of the chassis.
    ///
    /// Units: meters/second
    pub max_trans_speed_ms: f64,

    /// Maximum rotation rate of the chassis.
    ///
    /// Units: radians/second
    pub max_ang_speed_rads: f64,

    /// Maximum translational acceleration allowed by the limiter.
    ///
    /// Units: meters/second^2
    pub max_trans_accel_mss: f64,

    /// Maximum angular acceleration allowed by the limiter.
    ///
    /// Units: radians/second^2
    pub max_ang_accel_radss: f64,

    // ---- TIMING ----

    /// Period of the control loop.
    ///
    /// Units: seconds
    pub tick_period_s: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            module_pos_m_rb: [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]],
            max_wheel_speed_ms: 4.5,
            max_trans_speed_ms: 4.5,
            max_ang_speed_rads: 10.0,
            max_trans_accel_mss: 8.0,
            max_ang_accel_radss: 20.0,
            tick_period_s: 0.02,
        }
    }
}
