//! # Trajectory controllers module
//!
//! This module provides the PID controllers used for trajectory following and heading control.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::Serialize;
use util::maths::rem_euclid;

// Internal
use super::{Params, TrajectorySample};
use crate::{loc::Pose, loco_ctrl::ChassisVelocity};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller run at a fixed period.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Time between calls
    period_s: f64,

    /// If set the input wraps around within `(min, max)` and errors take the shortest way round
    continuous: Option<(f64, f64)>,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// Holonomic trajectory follower: feedforward from the trajectory plus PID feedback on x, y and
/// heading.
#[derive(Debug, Clone)]
pub struct HolonomicController {
    x_ctrl: PidController,
    y_ctrl: PidController,
    head_ctrl: PidController,

    pos_tolerance_m: f64,
    heading_tolerance_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, period_s: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            period_s,
            continuous: None,
            prev_error: None,
            integral: 0f64,
        }
    }

    /// Treat the input as wrapping between `min` and `max`.
    pub fn with_continuous_input(mut self, min: f64, max: f64) -> Self {
        self.continuous = Some((min, max));
        self
    }

    /// Forget the error history.
    pub fn reset(&mut self) {
        self.prev_error = None;
        self.integral = 0f64;
    }

    /// Error between the setpoint and the measurement, wrapped if the input is continuous.
    pub fn error(&self, measurement: f64, setpoint: f64) -> f64 {
        let error = setpoint - measurement;

        match self.continuous {
            Some((min, max)) => {
                let range = max - min;
                rem_euclid(error + range / 2.0, range) - range / 2.0
            }
            None => error,
        }
    }

    /// Get the output for the given measurement and setpoint.
    pub fn calculate(&mut self, measurement: f64, setpoint: f64) -> f64 {
        let error = self.error(measurement, setpoint);
        self.get(error)
    }

    /// Get the value of the controller for the given error.
    pub fn get(&mut self, error: f64) -> f64 {
        self.integral += error * self.period_s;

        // No derivative on the first call after a reset
        let deriv = match self.prev_error {
            Some(e) => (error - e) / self.period_s,
            None => 0f64,
        };

        let out =
            self.k_p * error
            + self.k_i * self.integral
            + self.k_d * deriv;

        self.prev_error = Some(error);

        out
    }
}

impl HolonomicController {

    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &Params, period_s: f64) -> Self {
        Self {
            x_ctrl: PidController::new(
                params.trans_k_p, params.trans_k_i, params.trans_k_d, period_s
            ),
            y_ctrl: PidController::new(
                params.trans_k_p, params.trans_k_i, params.trans_k_d, period_s
            ),
            head_ctrl: PidController::new(
                params.head_k_p, params.head_k_i, params.head_k_d, period_s
            ).with_continuous_input(-std::f64::consts::PI, std::f64::consts::PI),
            pos_tolerance_m: params.pos_tolerance_m,
            heading_tolerance_rad: params.heading_tolerance_rad,
        }
    }

    pub fn reset(&mut self) {
        self.x_ctrl.reset();
        self.y_ctrl.reset();
        self.head_ctrl.reset();
    }

    /// Chassis-frame velocity demand to track `target` from `pose`.
    pub fn calculate(&mut self, pose: &Pose, target: &TrajectorySample) -> ChassisVelocity {
        let ff: Vector2<f64> = target.velocity_ms;

        let x_fb = self.x_ctrl.calculate(pose.x(), target.pose.x());
        let y_fb = self.y_ctrl.calculate(pose.y(), target.pose.y());
        let head_fb = self.head_ctrl.calculate(pose.heading_rad, target.pose.heading_rad);

        trace!(
            "HolonomicController feedback: x {:.3}, y {:.3}, head {:.3}",
            x_fb, y_fb, head_fb
        );

        let field = ChassisVelocity::new(
            ff[0] + x_fb,
            ff[1] + y_fb,
            target.omega_rads + head_fb,
        );

        ChassisVelocity::from_field_relative(field, pose.heading_rad)
    }

    /// True if `pose` is within tolerance of `goal`.
    pub fn at_reference(&self, pose: &Pose, goal: &Pose) -> bool {
        pose.distance(goal) <= self.pos_tolerance_m
            && pose.heading_error(goal).abs() <= self.heading_tolerance_rad
    }
}
