//! Chassis velocity

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::Serialize;

use crate::loc::{Pose, Twist};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Velocity of the chassis, in the chassis frame unless stated otherwise.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct ChassisVelocity {
    /// Forward velocity.
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// Leftward velocity.
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Anticlockwise rotation rate.
    ///
    /// Units: radians/second
    pub omega_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ChassisVelocity {
    pub fn new(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// True if every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.vx_ms == 0.0 && self.vy_ms == 0.0 && self.omega_rads == 0.0
    }

    pub fn translation(&self) -> Vector2<f64> {
        Vector2::new(self.vx_ms, self.vy_ms)
    }

    /// Build a chassis-frame velocity from a field-frame velocity given the chassis heading.
    pub fn from_field_relative(field: ChassisVelocity, heading_rad: f64) -> Self {
        let v = Rotation2::new(-heading_rad) * field.translation();
        Self::new(v[0], v[1], field.omega_rads)
    }

    /// Express this chassis-frame velocity in the field frame.
    pub fn to_field_relative(&self, heading_rad: f64) -> Self {
        let v = Rotation2::new(heading_rad) * self.translation();
        Self::new(v[0], v[1], self.omega_rads)
    }

    /// Correct for the skew introduced by holding a velocity constant over a whole tick.
    ///
    /// Holding `(vx, vy, omega)` for `dt` moves the chassis along an arc rather than the
    /// straight line that was asked for. This finds the velocity whose arc ends at the pose
    /// the straight-line motion would have reached.
    pub fn discretize(&self, dt_s: f64) -> Self {
        if dt_s <= 0.0 {
            return *self;
        }

        let desired = Pose::new(
            self.vx_ms * dt_s,
            self.vy_ms * dt_s,
            self.omega_rads * dt_s,
        );
        let twist = Pose::default().log(&desired);

        // Pose::new wraps the heading, rotation rates beyond pi/dt are left uncorrected
        let omega = if (self.omega_rads * dt_s).abs() < std::f64::consts::PI {
            twist.dtheta_rad / dt_s
        } else {
            self.omega_rads
        };

        Self::new(twist.dx_m / dt_s, twist.dy_m / dt_s, omega)
    }

    /// The motion produced by holding this velocity for `dt_s`.
    pub fn to_twist(&self, dt_s: f64) -> Twist {
        Twist {
            dx_m: self.vx_ms * dt_s,
            dy_m: self.vy_ms * dt_s,
            dtheta_rad: self.omega_rads * dt_s,
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.vx_ms, self.vy_ms, self.omega_rads]
    }
}
