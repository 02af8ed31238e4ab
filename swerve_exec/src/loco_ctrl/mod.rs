//! Locomotion control module
//!
//! Owns the four swerve modules and the gyro. Every chassis velocity demand passes through the
//! acceleration limiter, tick discretisation, the kinematics and finally desaturation before it
//! reaches the modules.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod chassis;
mod kinematics;
mod limiter;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use chassis::*;
pub use kinematics::*;
pub use limiter::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LocoCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum LocoCtrlError {
    #[error("The module layout is invalid: {0}")]
    InvalidGeometry(String),

    #[error("The tick period must be positive, got {0} s")]
    InvalidTickPeriod(f64),
}
