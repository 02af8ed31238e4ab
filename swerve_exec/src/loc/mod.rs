//! # Localisation module
//!
//! This module provides the platform's best estimate of its pose in the field frame, fusing wheel
//! odometry, the gyro heading and occasional absolute pose observations.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod estimator;
mod params;
mod pose;

pub use estimator::*;
pub use params::Params;
pub use pose::*;
