//! Heading control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the heading lock and point focus controllers.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Maximum rotation rate of the profile.
    ///
    /// Units: radians/second
    pub max_ang_vel_rads: f64,

    /// Maximum angular acceleration of the profile.
    ///
    /// Units: radians/second^2
    pub max_ang_accel_radss: f64,

    /// Added to the bearing from the focus point to the platform to give the target heading.
    /// With pi the front of the platform faces the point, with 0 the back does.
    ///
    /// Units: radians
    pub focus_offset_rad: f64,

    /// Field point tracked by the focus action.
    ///
    /// Units: meters
    pub focus_point_m: [f64; 2],

    /// D-pad directions bound to a heading lock. The lock target is the negated direction.
    ///
    /// Units: degrees clockwise from up
    pub lock_directions_deg: Vec<u16>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            k_p: 5.0,
            k_i: 0.0,
            k_d: 0.1,
            max_ang_vel_rads: 8.0,
            max_ang_accel_radss: 16.0,
            focus_offset_rad: std::f64::consts::PI,
            focus_point_m: [8.0, 4.0],
            lock_directions_deg: vec![0, 90, 180, 270],
        }
    }
}
