//! Profiled PID controller over a wrapping angle

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use util::maths::get_ang_dist_2pi;

use crate::traj_ctrl::{
    profile::{Constraints, ProfileState, TrapezoidProfile},
    PidController,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller whose setpoint follows a trapezoid profile towards the goal angle.
///
/// Angles wrap at a full turn, the setpoint always takes the shortest way round.
#[derive(Debug, Clone)]
pub struct ProfiledPidController {
    pid: PidController,
    constraints: Constraints,
    period_s: f64,
    setpoint: ProfileState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ProfiledPidController {
    pub fn new(
        k_p: f64,
        k_i: f64,
        k_d: f64,
        constraints: Constraints,
        period_s: f64,
    ) -> Self {
        Self {
            pid: PidController::new(k_p, k_i, k_d, period_s).with_continuous_input(-PI, PI),
            constraints,
            period_s,
            setpoint: ProfileState::default(),
        }
    }

    /// Restart the profile from the measured angle and rate.
    pub fn reset(&mut self, angle_rad: f64, rate_rads: f64) {
        self.setpoint = ProfileState::new(angle_rad, rate_rads);
        self.pid.reset();
    }

    /// Output for the measured angle and the goal angle.
    pub fn calculate(&mut self, measurement_rad: f64, goal_rad: f64) -> f64 {
        // Unwrap both goal and setpoint to be within half a turn of the measurement
        let goal = measurement_rad + get_ang_dist_2pi(measurement_rad, goal_rad);
        let setpoint = measurement_rad + get_ang_dist_2pi(measurement_rad, self.setpoint.position);

        let profile = TrapezoidProfile::new(
            self.constraints,
            ProfileState::new(setpoint, self.setpoint.velocity),
            ProfileState::new(goal, 0.0),
        );
        self.setpoint = profile.sample(self.period_s);

        self.pid.calculate(measurement_rad, self.setpoint.position)
    }

    pub fn setpoint(&self) -> ProfileState {
        self.setpoint
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ctrl() -> ProfiledPidController {
        ProfiledPidController::new(1.0, 0.0, 0.0, Constraints::new(100.0, 1e6), 0.02)
    }

    #[test]
    fn test_wraps_short_way() {
        let mut c = ctrl();
        let from = 359f64.to_radians();
        c.reset(from, 0.0);

        // With loose constraints the setpoint jumps straight to the goal
        let out = c.calculate(from, 1f64.to_radians());
        assert_abs_diff_eq!(out, 2f64.to_radians(), epsilon = 1e-9);
    }

    #[test]
    fn test_profile_limits_setpoint() {
        let mut c = ProfiledPidController::new(1.0, 0.0, 0.0, Constraints::new(1.0, 10.0), 0.02);
        c.reset(0.0, 0.0);

        let out = c.calculate(0.0, 1.5);

        // One tick of acceleration from rest
        assert_abs_diff_eq!(c.setpoint().velocity, 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(out, 0.5 * 10.0 * 0.02 * 0.02, epsilon = 1e-9);
    }

    #[test]
    fn test_reset_captures_rate() {
        let mut c = ProfiledPidController::new(1.0, 0.0, 0.0, Constraints::new(1.0, 10.0), 0.02);
        c.reset(0.0, 1.0);
        c.calculate(0.0, 1.5);

        // Already at the velocity limit, the setpoint cruises
        assert_abs_diff_eq!(c.setpoint().velocity, 1.0, epsilon = 1e-9);
    }
}
