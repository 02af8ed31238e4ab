//! # Trajectories
//!
//! A trajectory is a polyline through field-frame waypoints, timed by a trapezoid profile on arc
//! length. The holonomic heading is timed by its own trapezoid profile from the start heading to
//! the end heading, so the platform can turn while it translates.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;
use util::maths::{get_ang_dist_2pi, wrap_pi};

use super::{
    profile::{Constraints, ProfileState, TrapezoidProfile},
    TrajError,
};
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Trajectories shorter than this, with no heading change either, are degenerate.
const MIN_LENGTH_M: f64 = 1e-6;

/// Heading changes smaller than this are treated as none.
const MIN_TURN_RAD: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motion constraints applied when building a trajectory.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub struct TrajConstraints {
    /// Units: meters/second
    pub max_vel_ms: f64,

    /// Units: meters/second^2
    pub max_accel_mss: f64,

    /// Units: radians/second
    pub max_ang_vel_rads: f64,

    /// Units: radians/second^2
    pub max_ang_accel_radss: f64,
}

/// The state the trajectory ends in.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct EndState {
    /// Speed along the path at the end.
    ///
    /// Units: meters/second
    pub velocity_ms: f64,

    /// Holonomic heading at the end.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// The desired state at one instant of a trajectory.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TrajectorySample {
    pub time_s: f64,

    /// Desired position and holonomic heading.
    pub pose: Pose,

    /// Desired velocity in the field frame.
    ///
    /// Units: meters/second
    pub velocity_ms: Vector2<f64>,

    /// Desired rotation rate.
    ///
    /// Units: radians/second
    pub omega_rads: f64,
}

/// An immutable time-parameterised path.
#[derive(Debug, Clone)]
pub struct Trajectory {
    waypoints_m: Vec<Vector2<f64>>,

    /// Arc length at each waypoint.
    cum_dist_m: Vec<f64>,

    start_heading_rad: f64,
    end: EndState,

    trans_profile: TrapezoidProfile,
    heading_profile: TrapezoidProfile,

    duration_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajConstraints {
    fn check(&self) -> Result<(), TrajError> {
        let trans = Constraints::new(self.max_vel_ms, self.max_accel_mss);
        let ang = Constraints::new(self.max_ang_vel_rads, self.max_ang_accel_radss);

        if trans.is_valid() && ang.is_valid() {
            Ok(())
        } else {
            Err(TrajError::InvalidConstraints(*self))
        }
    }
}

impl Trajectory {
    /// Build a trajectory through `waypoints_m`, starting at rest with the given heading.
    pub fn new(
        waypoints_m: Vec<Vector2<f64>>,
        start_heading_rad: f64,
        end: EndState,
        constraints: TrajConstraints,
    ) -> Result<Self, TrajError> {
        constraints.check()?;

        if waypoints_m.len() < 2 {
            return Err(TrajError::TooFewWaypoints(waypoints_m.len()));
        }
        if waypoints_m.iter().any(|w| !w[0].is_finite() || !w[1].is_finite())
            || !start_heading_rad.is_finite()
            || !end.heading_rad.is_finite()
            || !end.velocity_ms.is_finite()
        {
            return Err(TrajError::NonFinite);
        }

        let mut cum_dist_m = Vec::with_capacity(waypoints_m.len());
        let mut total = 0.0;
        cum_dist_m.push(total);
        for pair in waypoints_m.windows(2) {
            total += (pair[1] - pair[0]).norm();
            cum_dist_m.push(total);
        }

        let turn_rad = get_ang_dist_2pi(start_heading_rad, end.heading_rad);

        if total < MIN_LENGTH_M && turn_rad.abs() < MIN_TURN_RAD {
            return Err(TrajError::Degenerate);
        }

        // Starting from rest the path can only be left as fast as it can be accelerated along
        let reachable_vel = (2.0 * constraints.max_accel_mss * total).sqrt();
        let end_vel = end
            .velocity_ms
            .abs()
            .min(constraints.max_vel_ms)
            .min(reachable_vel);
        let trans_profile = TrapezoidProfile::new(
            Constraints::new(constraints.max_vel_ms, constraints.max_accel_mss),
            ProfileState::new(0.0, 0.0),
            ProfileState::new(total, end_vel),
        );
        let heading_profile = TrapezoidProfile::new(
            Constraints::new(constraints.max_ang_vel_rads, constraints.max_ang_accel_radss),
            ProfileState::new(0.0, 0.0),
            ProfileState::new(turn_rad, 0.0),
        );

        let duration_s = trans_profile.total_time().max(heading_profile.total_time());

        Ok(Self {
            waypoints_m,
            cum_dist_m,
            start_heading_rad: wrap_pi(start_heading_rad),
            end: EndState {
                velocity_ms: end_vel,
                heading_rad: wrap_pi(end.heading_rad),
            },
            trans_profile,
            heading_profile,
            duration_s,
        })
    }

    /// Generate a straight trajectory from `start` to `goal`, ending at rest with `goal`'s heading.
    pub fn generate(
        start: &Pose,
        goal: &Pose,
        constraints: TrajConstraints,
    ) -> Result<Self, TrajError> {
        Self::new(
            vec![start.position_m, goal.position_m],
            start.heading_rad,
            EndState {
                velocity_ms: 0.0,
                heading_rad: goal.heading_rad,
            },
            constraints,
        )
    }

    /// Total time of the trajectory.
    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    /// Total path length.
    pub fn length_m(&self) -> f64 {
        self.cum_dist_m.last().copied().unwrap_or(0.0)
    }

    pub fn waypoints_m(&self) -> &[Vector2<f64>] {
        &self.waypoints_m
    }

    pub fn initial_pose(&self) -> Pose {
        Pose {
            position_m: self.waypoints_m[0],
            heading_rad: self.start_heading_rad,
        }
    }

    pub fn end_pose(&self) -> Pose {
        Pose {
            position_m: self.waypoints_m[self.waypoints_m.len() - 1],
            heading_rad: self.end.heading_rad,
        }
    }

    pub fn end_state(&self) -> EndState {
        self.end
    }

    /// The desired state `t_s` seconds into the trajectory. Times past the end give the end state.
    pub fn sample(&self, t_s: f64) -> TrajectorySample {
        let t_s = t_s.max(0.0);

        let trans = self.trans_profile.sample(t_s);
        let (position_m, direction) = self.point_at(trans.position);

        let head = self.heading_profile.sample(t_s);

        TrajectorySample {
            time_s: t_s,
            pose: Pose {
                position_m,
                heading_rad: wrap_pi(self.start_heading_rad + head.position),
            },
            velocity_ms: direction * trans.velocity,
            omega_rads: head.velocity,
        }
    }

    /// Position at arc length `dist_m` and the unit direction of travel there.
    fn point_at(&self, dist_m: f64) -> (Vector2<f64>, Vector2<f64>) {
        let last = self.waypoints_m.len() - 1;

        // Index of the segment containing dist_m, skipping zero length segments
        let mut seg = last - 1;
        for i in 0..last {
            if dist_m <= self.cum_dist_m[i + 1] && self.cum_dist_m[i + 1] > self.cum_dist_m[i] {
                seg = i;
                break;
            }
        }

        let start = self.waypoints_m[seg];
        let delta = self.waypoints_m[seg + 1] - start;
        let seg_len = self.cum_dist_m[seg + 1] - self.cum_dist_m[seg];

        if seg_len <= 0.0 {
            return (self.waypoints_m[last], Vector2::zeros());
        }

        let direction = delta / seg_len;
        let along = (dist_m - self.cum_dist_m[seg]).max(0.0).min(seg_len);

        (start + direction * along, direction)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn constraints() -> TrajConstraints {
        TrajConstraints {
            max_vel_ms: 2.0,
            max_accel_mss: 2.0,
            max_ang_vel_rads: 3.0,
            max_ang_accel_radss: 6.0,
        }
    }

    #[test]
    fn test_generated_line() {
        let traj = Trajectory::generate(
            &Pose::new(4.0, 4.0, 0.0),
            &Pose::new(8.0, 4.0, FRAC_PI_2),
            constraints(),
        )
        .unwrap();

        // 1 s accelerating, 1 s cruising, 1 s decelerating
        assert_abs_diff_eq!(traj.duration_s(), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(traj.length_m(), 4.0);

        let mid = traj.sample(1.5);
        assert_abs_diff_eq!(mid.pose.x(), 6.0, epsilon = 1e-9);
        assert_abs_diff_eq!(mid.velocity_ms[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(mid.velocity_ms[1], 0.0, epsilon = 1e-9);

        let end = traj.sample(10.0);
        assert_abs_diff_eq!(end.pose.x(), 8.0, epsilon = 1e-9);
        assert_abs_diff_eq!(end.pose.heading_rad, FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(end.velocity_ms.norm(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(end.omega_rads, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_polyline_corner() {
        let traj = Trajectory::new(
            vec![Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), Vector2::new(1.0, 1.0)],
            0.0,
            EndState { velocity_ms: 0.0, heading_rad: 0.0 },
            constraints(),
        )
        .unwrap();

        assert_abs_diff_eq!(traj.length_m(), 2.0);

        // The trapezoid is symmetric so the corner is reached at half time
        let s = traj.sample(traj.duration_s() / 2.0);
        assert_abs_diff_eq!(s.pose.x(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s.pose.y(), 0.0, epsilon = 1e-9);

        let s = traj.sample(traj.duration_s() * 0.75);
        assert_abs_diff_eq!(s.pose.x(), 1.0, epsilon = 1e-9);
        assert!(s.velocity_ms[1] > 0.0);
    }

    #[test]
    fn test_end_velocity_limited_by_length() {
        // 2 m/s is not reachable over 0.1 m at 2 m/s^2
        let traj = Trajectory::new(
            vec![Vector2::new(0.0, 0.0), Vector2::new(0.1, 0.0)],
            0.0,
            EndState { velocity_ms: 2.0, heading_rad: 0.0 },
            constraints(),
        )
        .unwrap();

        assert_abs_diff_eq!(traj.end_state().velocity_ms, 0.4f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(traj.duration_s(), 0.1f64.sqrt(), epsilon = 1e-9);

        // Monotonic along the path and never beyond its end
        let mut last_x = 0.0;
        for i in 0..=20 {
            let s = traj.sample(traj.duration_s() * i as f64 / 20.0);
            assert!(s.pose.x() >= last_x - 1e-9);
            assert!(s.pose.x() <= 0.1 + 1e-9);
            last_x = s.pose.x();
        }

        let end = traj.sample(traj.duration_s());
        assert_abs_diff_eq!(end.pose.x(), 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(end.velocity_ms[0], 0.4f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(traj.sample(1.0).velocity_ms[0], 0.4f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_heading_takes_shortest_way() {
        let traj = Trajectory::generate(
            &Pose::new(0.0, 0.0, 3.0),
            &Pose::new(1.0, 0.0, -3.0),
            constraints(),
        )
        .unwrap();

        // From 3 rad to -3 rad is +0.28 rad through pi
        assert!(traj.sample(0.1).omega_rads > 0.0);
    }

    #[test]
    fn test_rotation_only_allowed() {
        let traj = Trajectory::generate(
            &Pose::new(1.0, 1.0, 0.0),
            &Pose::new(1.0, 1.0, 1.0),
            constraints(),
        )
        .unwrap();

        assert!(traj.duration_s() > 0.0);
        assert_abs_diff_eq!(traj.sample(0.2).pose.x(), 1.0);
    }

    #[test]
    fn test_degenerate() {
        let p = Pose::new(1.0, 1.0, 0.5);
        assert!(matches!(
            Trajectory::generate(&p, &p, constraints()),
            Err(TrajError::Degenerate)
        ));

        assert!(matches!(
            Trajectory::new(
                vec![Vector2::new(0.0, 0.0)],
                0.0,
                EndState { velocity_ms: 0.0, heading_rad: 0.0 },
                constraints()
            ),
            Err(TrajError::TooFewWaypoints(1))
        ));

        let mut bad = constraints();
        bad.max_vel_ms = 0.0;
        assert!(matches!(
            Trajectory::generate(&p, &Pose::new(2.0, 1.0, 0.5), bad),
            Err(TrajError::InvalidConstraints(_))
        ));

        assert!(matches!(
            Trajectory::generate(&p, &Pose::new(f64::NAN, 1.0, 0.5), constraints()),
            Err(TrajError::NonFinite)
        ));
    }
}
