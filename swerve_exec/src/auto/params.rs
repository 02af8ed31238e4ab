//! Autonomous parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::traj_ctrl::PathParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the autonomous routines.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Routine selected until the operator chooses another.
    pub default_routine: String,

    /// Named paths used by the routines.
    pub paths: BTreeMap<String, PathParams>,

    /// Goal of the on the fly `driveToCenter` routine, `[x, y, heading]`.
    ///
    /// Units: meters, meters, radians
    pub center_goal: [f64; 3],

    pub mechs: MechParams,
}

/// Demands and timings for the mechanism actions used in routines.
#[derive(Debug, Clone, Deserialize)]
pub struct MechParams {
    /// Flywheel speed for shooting.
    ///
    /// Units: radians/second
    pub flywheel_shoot_demand: f64,

    /// Time given to the flywheels to spin up before the first shot.
    ///
    /// Units: seconds
    pub spin_up_s: f64,

    /// Roller demand while intaking.
    pub intake_roller_demand: f64,

    /// Roller demand while feeding a note into the flywheels.
    pub feed_roller_demand: f64,

    /// Time the rollers feed for each shot.
    ///
    /// Units: seconds
    pub feed_time_s: f64,

    /// Time allowed for intaking on each leg of a multi note routine.
    ///
    /// Units: seconds
    pub intake_timeout_s: f64,

    /// Intake pivot angle when deployed.
    ///
    /// Units: radians
    pub pivot_deployed_rad: f64,

    /// Intake pivot angle when stowed.
    ///
    /// Units: radians
    pub pivot_home_rad: f64,

    /// Time the pivot is driven towards deployed to unlatch it at the start of a routine.
    ///
    /// Units: seconds
    pub pivot_unlatch_s: f64,
}

impl Default for MechParams {
    fn default() -> Self {
        Self {
            flywheel_shoot_demand: 10.0,
            spin_up_s: 0.5,
            intake_roller_demand: 6.0,
            feed_roller_demand: 8.0,
            feed_time_s: 0.3,
            intake_timeout_s: 1.6,
            pivot_deployed_rad: 3.0,
            pivot_home_rad: 0.0,
            pivot_unlatch_s: 0.1,
        }
    }
}
