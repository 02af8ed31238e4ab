//! # Trapezoid motion profile
//!
//! A one dimensional profile which accelerates at a constant rate up to a maximum velocity,
//! cruises, then decelerates to reach the goal. If the distance is too short to reach the
//! maximum velocity the profile becomes a triangle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Velocity and acceleration limits of a profile.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub max_velocity: f64,
    pub max_acceleration: f64,
}

/// A position and velocity along a profile.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct ProfileState {
    pub position: f64,
    pub velocity: f64,
}

/// A trapezoid profile between two states.
#[derive(Debug, Copy, Clone)]
pub struct TrapezoidProfile {
    constraints: Constraints,

    /// -1 if the goal lies behind the start, the profile is solved in the flipped frame.
    direction: f64,

    start: ProfileState,
    goal: ProfileState,

    end_accel_s: f64,
    end_full_speed_s: f64,
    end_decel_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Constraints {
    pub fn new(max_velocity: f64, max_acceleration: f64) -> Self {
        Self {
            max_velocity,
            max_acceleration,
        }
    }

    /// True if both limits are finite and positive.
    pub fn is_valid(&self) -> bool {
        self.max_velocity.is_finite()
            && self.max_acceleration.is_finite()
            && self.max_velocity > 0.0
            && self.max_acceleration > 0.0
    }
}

impl ProfileState {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    fn directed(&self, direction: f64) -> Self {
        Self::new(self.position * direction, self.velocity * direction)
    }
}

impl TrapezoidProfile {
    /// Build the profile from `start` to `goal`.
    ///
    /// Constraints must be valid, see [`Constraints::is_valid`].
    pub fn new(constraints: Constraints, start: ProfileState, goal: ProfileState) -> Self {
        let direction = if start.position > goal.position { -1.0 } else { 1.0 };
        let mut start = start.directed(direction);
        let goal = goal.directed(direction);

        let max_v = constraints.max_velocity;
        let max_a = constraints.max_acceleration;

        if start.velocity > max_v {
            start.velocity = max_v;
        }

        // Portions of the trapezoid already "behind" the start and "beyond" the goal
        let cutoff_begin = start.velocity / max_a;
        let cutoff_dist_begin = cutoff_begin * cutoff_begin * max_a / 2.0;
        let cutoff_end = goal.velocity / max_a;
        let cutoff_dist_end = cutoff_end * cutoff_end * max_a / 2.0;

        let full_trapezoid_dist =
            cutoff_dist_begin + (goal.position - start.position) + cutoff_dist_end;
        let mut accel_time = max_v / max_a;
        let mut full_speed_dist = full_trapezoid_dist - accel_time * accel_time * max_a;

        if full_speed_dist < 0.0 {
            accel_time = (full_trapezoid_dist / max_a).max(0.0).sqrt();
            full_speed_dist = 0.0;
        }

        let end_accel_s = accel_time - cutoff_begin;
        let end_full_speed_s = end_accel_s + full_speed_dist / max_v;
        let end_decel_s = end_full_speed_s + accel_time - cutoff_end;

        Self {
            constraints,
            direction,
            start,
            goal,
            end_accel_s,
            end_full_speed_s,
            end_decel_s,
        }
    }

    /// The state of the profile `t_s` seconds after its start.
    pub fn sample(&self, t_s: f64) -> ProfileState {
        let max_v = self.constraints.max_velocity;
        let max_a = self.constraints.max_acceleration;
        let start = self.start;
        let mut result = start;

        if self.is_finished(t_s) {
            result = self.goal;
        } else if t_s < self.end_accel_s {
            result.velocity += t_s * max_a;
            result.position += (start.velocity + t_s * max_a / 2.0) * t_s;
        } else if t_s < self.end_full_speed_s {
            result.velocity = max_v;
            result.position += (start.velocity + self.end_accel_s * max_a / 2.0)
                * self.end_accel_s
                + max_v * (t_s - self.end_accel_s);
        } else {
            let time_left = self.end_decel_s - t_s;
            result.velocity = self.goal.velocity + time_left * max_a;
            result.position =
                self.goal.position - (self.goal.velocity + time_left * max_a / 2.0) * time_left;
        }

        result.directed(self.direction)
    }

    /// Time taken to reach the goal.
    pub fn total_time(&self) -> f64 {
        self.end_decel_s.max(0.0)
    }

    pub fn is_finished(&self, t_s: f64) -> bool {
        t_s >= self.total_time()
    }
}
