//! # Communications interface crate.
//!
//! Provides all common interfaces between the control core and the things it
//! talks to: the drivetrain and mechanism equipment, the operator, and the
//! telemetry sink.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator telecommands and input snapshots
pub mod tc;

/// Interfaces to equipment (swerve modules, gyro, mechanisms, pose sources)
pub mod eqpt;

/// Telemetry sink interface
pub mod tm;
