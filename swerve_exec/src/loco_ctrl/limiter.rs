//! Chassis acceleration limiter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use util::maths::clamp;

use super::ChassisVelocity;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Rate limits the chassis velocity between ticks.
///
/// Translation is limited as a vector, so the direction of a change is kept and only its size
/// is reduced. Rotation is limited separately.
#[derive(Debug, Clone)]
pub struct AccelLimiter {
    max_trans_step_ms: f64,
    max_ang_step_rads: f64,
    last: ChassisVelocity,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AccelLimiter {
    pub fn new(max_trans_accel_mss: f64, max_ang_accel_radss: f64, tick_period_s: f64) -> Self {
        Self {
            max_trans_step_ms: max_trans_accel_mss * tick_period_s,
            max_ang_step_rads: max_ang_accel_radss * tick_period_s,
            last: ChassisVelocity::zero(),
        }
    }

    /// Limit the request and remember the limited value as the new previous output.
    pub fn calculate(&mut self, request: &ChassisVelocity) -> ChassisVelocity {
        let mut delta = request.translation() - self.last.translation();
        let d_omega = request.omega_rads - self.last.omega_rads;
        let norm = delta.norm();

        let out = if norm <= self.max_trans_step_ms && d_omega.abs() <= self.max_ang_step_rads {
            *request
        } else {
            if norm > self.max_trans_step_ms {
                delta *= self.max_trans_step_ms / norm;
            }
            let d_omega = clamp(&d_omega, &-self.max_ang_step_rads, &self.max_ang_step_rads);

            ChassisVelocity::new(
                self.last.vx_ms + delta[0],
                self.last.vy_ms + delta[1],
                self.last.omega_rads + d_omega,
            )
        };

        trace!("AccelLimiter: {:?} -> {:?}", request, out);

        self.last = out;
        out
    }

    /// Forget the previous output and start limiting from `vel`.
    pub fn reset(&mut self, vel: ChassisVelocity) {
        self.last = vel;
    }

    pub fn last(&self) -> ChassisVelocity {
        self.last
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn test_step_limited() {
        let mut lim = AccelLimiter::new(5.0, 10.0, 0.02);
        let out = lim.calculate(&ChassisVelocity::new(3.0, 4.0, 2.0));

        // 0.1 m/s along the (3, 4) direction
        assert_abs_diff_eq!(out.vx_ms, 0.06, epsilon = 1e-12);
        assert_abs_diff_eq!(out.vy_ms, 0.08, epsilon = 1e-12);
        assert_abs_diff_eq!(out.omega_rads, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_state_follows_output() {
        let mut lim = AccelLimiter::new(5.0, 10.0, 0.02);
        for _ in 0..5 {
            lim.calculate(&ChassisVelocity::new(10.0, 0.0, 0.0));
        }
        assert_abs_diff_eq!(lim.last().vx_ms, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_small_request_passes() {
        let mut lim = AccelLimiter::new(5.0, 10.0, 0.02);
        let req = ChassisVelocity::new(0.05, 0.0, -0.1);
        assert_eq!(lim.calculate(&req), req);
        assert!(lim.calculate(&ChassisVelocity::zero()).is_zero());
    }

    proptest! {
        #[test]
        fn test_step_bound(
            reqs in proptest::collection::vec((-5.0f64..5.0, -5.0f64..5.0, -10.0f64..10.0), 1..40)
        ) {
            let dt = 0.02;
            let mut lim = AccelLimiter::new(4.0, 8.0, dt);
            let mut prev = ChassisVelocity::zero();

            for (vx, vy, w) in reqs {
                let out = lim.calculate(&ChassisVelocity::new(vx, vy, w));
                let d_trans = (out.translation() - prev.translation()).norm();
                let d_ang = (out.omega_rads - prev.omega_rads).abs();

                prop_assert!(d_trans <= 4.0 * dt + 1e-9);
                prop_assert!(d_ang <= 8.0 * dt + 1e-9);
                prev = out;
            }
        }
    }
}
