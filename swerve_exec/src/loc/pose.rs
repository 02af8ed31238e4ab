//! Pose and twist types in the field frame

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::vision::PoseObservation;
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use util::maths::{get_ang_dist_2pi, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading in the field frame) of the platform.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Pose {
    /// The position in the field frame.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// The heading of the platform, the angle between the field +X axis and the chassis +X axis.
    ///
    /// Units: radians, anticlockwise positive, wrapped to (-pi, pi]
    pub heading_rad: f64,
}

/// An incremental motion expressed in the frame of the pose it starts from.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Twist {
    pub dx_m: f64,
    pub dy_m: f64,
    pub dtheta_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad: wrap_pi(heading_rad),
        }
    }

    pub fn x(&self) -> f64 {
        self.position_m[0]
    }

    pub fn y(&self) -> f64 {
        self.position_m[1]
    }

    /// Apply a twist to this pose, following the constant-curvature arc it describes.
    pub fn exp(&self, twist: &Twist) -> Pose {
        let dtheta = twist.dtheta_rad;
        let sin_theta = dtheta.sin();
        let cos_theta = dtheta.cos();

        let (s, c) = if dtheta.abs() < 1e-9 {
            (1.0 - dtheta * dtheta / 6.0, 0.5 * dtheta)
        } else {
            (sin_theta / dtheta, (1.0 - cos_theta) / dtheta)
        };

        let delta_rb = Vector2::new(
            twist.dx_m * s - twist.dy_m * c,
            twist.dx_m * c + twist.dy_m * s,
        );

        Pose {
            position_m: self.position_m + Rotation2::new(self.heading_rad) * delta_rb,
            heading_rad: wrap_pi(self.heading_rad + dtheta),
        }
    }

    /// The twist which, applied to `self` with [`Pose::exp`], gives `end`.
    pub fn log(&self, end: &Pose) -> Twist {
        // The end pose expressed in this pose's frame
        let delta = Rotation2::new(-self.heading_rad) * (end.position_m - self.position_m);
        let dtheta = get_ang_dist_2pi(self.heading_rad, end.heading_rad);
        let half_dtheta = dtheta / 2.0;
        let cos_minus_one = dtheta.cos() - 1.0;

        let half_theta_by_tan = if cos_minus_one.abs() < 1e-9 {
            1.0 - dtheta * dtheta / 12.0
        } else {
            -(half_dtheta * dtheta.sin()) / cos_minus_one
        };

        let rot = Rotation2::new((-half_dtheta).atan2(half_theta_by_tan));
        let translation = rot * delta * half_theta_by_tan.hypot(half_dtheta);

        Twist {
            dx_m: translation[0],
            dy_m: translation[1],
            dtheta_rad: dtheta,
        }
    }

    /// Euclidian distance between the positions of two poses.
    pub fn distance(&self, other: &Pose) -> f64 {
        (self.position_m - other.position_m).norm()
    }

    /// Shortest signed angular distance from this pose's heading to `other`'s.
    pub fn heading_error(&self, other: &Pose) -> f64 {
        get_ang_dist_2pi(self.heading_rad, other.heading_rad)
    }

    /// The pose as a `[x, y, heading]` array, used in telemetry.
    pub fn to_array(&self) -> [f64; 3] {
        [self.position_m[0], self.position_m[1], self.heading_rad]
    }
}

impl From<PoseObservation> for Pose {
    fn from(obs: PoseObservation) -> Self {
        Pose::new(obs.position_m[0], obs.position_m[1], obs.heading_rad)
    }
}
