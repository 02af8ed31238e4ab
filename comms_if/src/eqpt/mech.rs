//! # Mechanisms Equipment
//!
//! Sub-mechanisms (intake, shooter, climber) that routines drive alongside the drivetrain.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::EqptError;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all sub-mechanisms available to the robot.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone, PartialOrd, Ord)]
pub enum MechId {
    IntakePivot,
    IntakeRollers,
    Flywheels,
    Climber,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A single-demand sub-mechanism.
///
/// The meaning of the demand depends on the mechanism, e.g. a flywheel speed in radians/second
/// or a pivot position in radians.
pub trait Mechanism {
    /// Set a new demand.
    fn set_demand(&mut self, demand: f64) -> Result<(), EqptError>;

    /// Returns true if the mechanism has reached its current demand.
    fn at_target(&mut self) -> Result<bool, EqptError>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MechId {
    /// All mechanism IDs.
    pub const ALL: [MechId; 4] = [
        MechId::IntakePivot,
        MechId::IntakeRollers,
        MechId::Flywheels,
        MechId::Climber,
    ];
}
