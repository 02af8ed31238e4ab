//! # Heading control module
//!
//! Closed loop control of the chassis heading, used to override the rotation of an otherwise
//! operator driven velocity. The target is either a fixed heading or the bearing to a point on
//! the field.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod profiled_pid;

pub use params::Params;
pub use profiled_pid::ProfiledPidController;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;
use util::maths::wrap_pi;

use crate::{loc::Pose, traj_ctrl::profile::Constraints};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// What the heading controller aims for.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum HeadingTarget {
    /// A constant field heading.
    Fixed { heading_rad: f64 },

    /// The bearing from a field point to the platform, plus an offset.
    FocusPoint {
        point_m: Vector2<f64>,
        offset_rad: f64,
    },
}

/// Heading controller for the lock and focus actions.
#[derive(Debug, Clone)]
pub struct HeadingController {
    pid: ProfiledPidController,
    target: HeadingTarget,
}


// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HeadingTarget {
    /// Lock to the heading opposite to a d-pad direction.
    pub fn from_pov(direction_deg: u16) -> Self {
        HeadingTarget::Fixed {
            heading_rad: wrap_pi(-(direction_deg as f64).to_radians()),
        }
    }

    /// Focus on the configured field point.
    pub fn focus(params: &Params) -> Self {
        HeadingTarget::FocusPoint {
            point_m: Vector2::new(params.focus_point_m[0], params.focus_point_m[1]),
            offset_rad: params.focus_offset_rad,
        }
    }

    /// The heading to aim for from the given pose.
    pub fn heading_for(&self, pose: &Pose) -> f64 {
        match self {
            HeadingTarget::Fixed { heading_rad } => *heading_rad,
            HeadingTarget::FocusPoint { point_m, offset_rad } => {
                let from_point = pose.position_m - point_m;
                wrap_pi(from_point[1].atan2(from_point[0]) + offset_rad)
            }
        }
    }
}

impl HeadingController {
    pub fn new(params: &Params, target: HeadingTarget, period_s: f64) -> Self {
        Self {
            pid: ProfiledPidController::new(
                params.k_p,
                params.k_i,
                params.k_d,
                Constraints::new(params.max_ang_vel_rads, params.max_ang_accel_radss),
                period_s,
            ),
            target,
        }
    }

    /// Start controlling from the current heading and rotation rate.
    pub fn start(&mut self, heading_rad: f64, yaw_rate_rads: f64) {
        debug!("Heading control started towards {:?}", self.target);
        self.pid.reset(heading_rad, yaw_rate_rads);
    }

    /// Rotation rate demand for this tick.
    pub fn calculate(&mut self, pose: &Pose) -> f64 {
        let goal = self.target.heading_for(pose);
        self.pid.calculate(pose.heading_rad, goal)
    }

    pub fn target(&self) -> HeadingTarget {
        self.target
    }
}
