//! # Equipment Interface
//!
//! This module defines the narrow interfaces through which the control core reaches physical
//! equipment. Drivers for the real hardware (motor controllers, IMU) live outside this workspace
//! and implement these traits.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod mech;
pub mod swerve;
pub mod vision;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors reported by equipment drivers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EqptError {
    /// The reading could not be acquired this cycle or is known to be invalid.
    #[error("Sensor reading is stale or invalid: {0}")]
    InvalidReading(String),

    /// Communications with the equipment have been lost. Demands cannot be actuated.
    #[error("Lost communications with equipment: {0}")]
    CommsLost(String),
}
