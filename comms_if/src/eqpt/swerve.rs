//! # Swerve drivetrain equipment

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::EqptError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of swerve modules on the platform.
pub const NUM_MODULES: usize = 4;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The state of a single swerve module, either measured or demanded.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    /// Steer angle of the wheel in the chassis frame.
    ///
    /// Units: radians, positive anticlockwise from the chassis +X axis.
    pub angle_rad: f64,

    /// Wheel ground speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,
}

/// Accumulated position of a single swerve module.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulePosition {
    /// Steer angle of the wheel in the chassis frame.
    ///
    /// Units: radians
    pub angle_rad: f64,

    /// Total distance the wheel has driven since the module was initialised.
    ///
    /// Units: meters
    pub distance_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Physical corner of a swerve module.
///
/// The order of the variants is the order of every module array in the software and must never
/// be permuted, as the kinematics matrix rows are built in this order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A single swerve module (drive motor + steer motor).
pub trait SwerveModule {
    /// Get the measured state (angle and speed) of the module.
    fn measured_state(&mut self) -> Result<ModuleState, EqptError>;

    /// Get the accumulated position (angle and distance) of the module.
    fn position(&mut self) -> Result<ModulePosition, EqptError>;

    /// Demand a new target state. If `closed_loop` is true the drive motor uses velocity
    /// feedback, otherwise feedforward only.
    fn set_target_state(&mut self, state: ModuleState, closed_loop: bool) -> Result<(), EqptError>;

    /// Set the drive motor to brake (true) or coast (false) when idle.
    fn set_brake_mode(&mut self, on: bool) -> Result<(), EqptError>;

    /// Point the wheel inwards to form an X with the other modules, resisting pushing.
    fn set_x_configuration(&mut self) -> Result<(), EqptError>;
}

/// The heading sensor.
pub trait Gyro {
    /// Raw heading of the platform.
    ///
    /// Units: radians, anticlockwise positive.
    fn heading_rad(&mut self) -> Result<f64, EqptError>;

    /// Yaw rate of the platform.
    ///
    /// Units: radians/second, anticlockwise positive.
    fn yaw_rate_rads(&mut self) -> Result<f64, EqptError>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Corner {
    /// All corners in module array order.
    pub const ALL: [Corner; NUM_MODULES] = [
        Corner::FrontLeft,
        Corner::FrontRight,
        Corner::BackLeft,
        Corner::BackRight,
    ];

    /// Index of this corner in module arrays.
    pub fn index(&self) -> usize {
        match self {
            Corner::FrontLeft => 0,
            Corner::FrontRight => 1,
            Corner::BackLeft => 2,
            Corner::BackRight => 3,
        }
    }

    /// Short name used in telemetry.
    pub fn name(&self) -> &'static str {
        match self {
            Corner::FrontLeft => "FrontLeft",
            Corner::FrontRight => "FrontRight",
            Corner::BackLeft => "BackLeft",
            Corner::BackRight => "BackRight",
        }
    }
}
