//! # Swerve library.
//!
//! The swerve drive control core. The executable runs it against simulated hardware, and the
//! integration tests drive it through [`robot::Robot`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomous routines - the named routines and the operator's choice between them
pub mod auto;

/// Command module - composes actions and schedules them with exclusive resource ownership
pub mod cmd;

/// Data store - state shared between the actions during a tick
pub mod data_store;

/// Heading control module - locks or focuses the chassis heading while the operator translates
pub mod heading_ctrl;

/// Localisation module - fuses odometry, gyro and absolute observations into a pose estimate
pub mod loc;

/// Locomotion control module - converts chassis velocities into individual module targets
pub mod loco_ctrl;

/// Robot - operating modes, operator bindings and the per tick sequence
pub mod robot;

/// Simulation client - ideal simulated modules, gyro, mechanisms and vision
pub mod sim_client;

/// Teleop - shapes the operator's sticks into a velocity request
pub mod teleop;

/// Telemetry server - publishes named values once per tick
pub mod tm_server;

/// Trajectory control module - generates trajectories and keeps the chassis on them
pub mod traj_ctrl;
