//! Pose estimator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::swerve::{ModulePosition, NUM_MODULES};
use log::{debug, info, warn};
use util::maths::{clamp, get_ang_dist_2pi, wrap_pi};

use super::{Params, Pose};
use crate::{loco_ctrl::SwerveKinematics, tm_server::TmServer};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fuses odometry and gyro heading into a pose, nudged towards absolute observations.
pub struct PoseEstimator {
    params: Params,
    kinematics: SwerveKinematics,

    pose: Pose,

    /// Added to the gyro heading to give the estimated heading.
    heading_offset_rad: f64,

    prev_heading_rad: f64,
    prev_positions: [ModulePosition; NUM_MODULES],

    /// The last update was rejected as physically impossible.
    sensor_fault: bool,
    num_rejected: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseEstimator {
    /// Create an estimator at the initial pose given in the parameters.
    pub fn new(
        params: Params,
        kinematics: SwerveKinematics,
        gyro_heading_rad: f64,
        positions: [ModulePosition; NUM_MODULES],
    ) -> Self {
        let [x, y, h] = params.initial_pose;
        let mut est = Self {
            params,
            kinematics,
            pose: Pose::default(),
            heading_offset_rad: 0.0,
            prev_heading_rad: 0.0,
            prev_positions: positions,
            sensor_fault: false,
            num_rejected: 0,
        };
        est.reset(Pose::new(x, y, h), gyro_heading_rad, positions);

        est
    }

    /// Advance the estimate using this tick's gyro heading and module positions.
    pub fn update(&mut self, gyro_heading_rad: f64, positions: [ModulePosition; NUM_MODULES]) {
        let heading = wrap_pi(gyro_heading_rad + self.heading_offset_rad);

        let mut twist = self.kinematics.to_twist(&self.prev_positions, &positions);
        twist.dtheta_rad = get_ang_dist_2pi(self.prev_heading_rad, heading);

        self.prev_positions = positions;

        let step_m = twist.dx_m.hypot(twist.dy_m);
        if step_m > self.params.max_odom_step_m
            || twist.dtheta_rad.abs() > self.params.max_odom_step_rad
        {
            warn!(
                "Rejected odometry step of {:.3} m, {:.3} rad",
                step_m, twist.dtheta_rad
            );

            // Re-anchor the gyro so the heading does not jump on the next tick either
            self.heading_offset_rad = self.pose.heading_rad - gyro_heading_rad;
            self.prev_heading_rad = self.pose.heading_rad;
            self.sensor_fault = true;
            self.num_rejected += 1;
            return;
        }

        let next = self.pose.exp(&twist);
        self.pose = Pose {
            position_m: next.position_m,
            heading_rad: heading,
        };
        self.prev_heading_rad = heading;
        self.sensor_fault = false;
    }

    /// Blend an absolute pose observation into the estimate.
    ///
    /// The estimate moves a fraction of the way towards the observation, the fraction scaling
    /// with `confidence`, and never by more than the configured maximum step.
    pub fn add_correction(&mut self, observed: &Pose, confidence: f64) {
        let confidence = clamp(&confidence, &0.0, &1.0);
        if confidence < self.params.min_correction_confidence {
            return;
        }

        let gain = confidence * self.params.max_correction_gain;

        let mut delta = (observed.position_m - self.pose.position_m) * gain;
        let norm = delta.norm();
        if norm > self.params.max_correction_step_m {
            delta *= self.params.max_correction_step_m / norm;
        }

        let d_heading = clamp(
            &(self.pose.heading_error(observed) * gain),
            &-self.params.max_correction_step_rad,
            &self.params.max_correction_step_rad,
        );

        debug!(
            "Pose correction of ({:.3}, {:.3}) m, {:.3} rad at confidence {:.2}",
            delta[0], delta[1], d_heading, confidence
        );

        self.pose = Pose {
            position_m: self.pose.position_m + delta,
            heading_rad: wrap_pi(self.pose.heading_rad + d_heading),
        };
        self.heading_offset_rad += d_heading;
        self.prev_heading_rad = self.pose.heading_rad;
    }

    /// Set the estimate to exactly `pose`, discarding accumulated drift.
    pub fn reset(
        &mut self,
        pose: Pose,
        gyro_heading_rad: f64,
        positions: [ModulePosition; NUM_MODULES],
    ) {
        self.pose = pose;
        self.heading_offset_rad = pose.heading_rad - gyro_heading_rad;
        self.prev_heading_rad = pose.heading_rad;
        self.prev_positions = positions;
        self.sensor_fault = false;

        info!(
            "Pose reset to ({:.3}, {:.3}, {:.3})",
            pose.x(),
            pose.y(),
            pose.heading_rad
        );
    }

    pub fn get_pose(&self) -> Pose {
        self.pose
    }

    pub fn sensor_fault(&self) -> bool {
        self.sensor_fault
    }

    pub fn num_rejected(&self) -> u64 {
        self.num_rejected
    }

    pub fn write_tm(&self, tm: &mut TmServer) {
        tm.send_pose("loc/pose", self.pose.to_array());
        tm.send_flag("loc/sensor_fault", self.sensor_fault);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::loco_ctrl;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector2;
    use std::f64::consts::FRAC_PI_2;

    fn positions(dist: f64, angle: f64) -> [ModulePosition; NUM_MODULES] {
        [ModulePosition { angle_rad: angle, distance_m: dist }; NUM_MODULES]
    }

    fn estimator() -> PoseEstimator {
        let kin = SwerveKinematics::new(loco_ctrl::Params::default().module_pos_m_rb).unwrap();
        PoseEstimator::new(Params::default(), kin, 0.0, positions(0.0, 0.0))
    }

    #[test]
    fn test_odometry_in_field_frame() {
        let mut est = estimator();
        est.reset(Pose::new(1.0, 1.0, FRAC_PI_2), 0.0, positions(0.0, 0.0));

        // Wheels forward 0.1 m per tick, chassis faces +Y
        for i in 1..=10 {
            est.update(0.0, positions(0.1 * i as f64, 0.0));
        }

        let p = est.get_pose();
        assert_abs_diff_eq!(p.x(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y(), 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.heading_rad, FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_reset_is_exact() {
        let mut est = estimator();
        for i in 1..=20 {
            est.update(0.01 * i as f64, positions(0.05 * i as f64, 0.3));
        }

        let p = Pose {
            position_m: Vector2::new(4.0, 4.0),
            heading_rad: 0.0,
        };
        est.reset(p, 0.2, positions(1.0, 0.3));
        assert_eq!(est.get_pose(), p);

        // No motion, no change
        est.update(0.2, positions(1.0, 0.3));
        assert_eq!(est.get_pose().position_m, p.position_m);
        assert_abs_diff_eq!(est.get_pose().heading_rad, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_impossible_step() {
        let mut est = estimator();
        est.update(0.0, positions(5.0, 0.0));

        assert!(est.sensor_fault());
        assert_eq!(est.get_pose().position_m, Vector2::new(0.0, 0.0));

        // Subsequent motion is measured from the new positions
        est.update(0.0, positions(5.1, 0.0));
        assert!(!est.sensor_fault());
        assert_abs_diff_eq!(est.get_pose().x(), 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_gyro_jump_does_not_move_heading() {
        let mut est = estimator();
        est.update(2.0, positions(0.0, 0.0));

        assert!(est.sensor_fault());
        assert_abs_diff_eq!(est.get_pose().heading_rad, 0.0);

        est.update(2.1, positions(0.0, 0.0));
        assert_abs_diff_eq!(est.get_pose().heading_rad, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_correction_is_bounded_and_converges() {
        let mut est = estimator();
        let obs = Pose::new(1.0, 0.0, 0.0);

        est.add_correction(&obs, 1.0);
        assert_abs_diff_eq!(est.get_pose().x(), 0.05, epsilon = 1e-12);

        for _ in 0..200 {
            est.add_correction(&obs, 1.0);
        }
        assert_abs_diff_eq!(est.get_pose().x(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_low_confidence_ignored() {
        let mut est = estimator();
        est.add_correction(&Pose::new(1.0, 0.0, 0.0), 0.01);
        assert_eq!(est.get_pose(), Pose::default());
    }

    #[test]
    fn test_heading_correction_persists() {
        let mut est = estimator();
        for _ in 0..100 {
            est.add_correction(&Pose::new(0.0, 0.0, 0.5), 1.0);
        }
        assert_abs_diff_eq!(est.get_pose().heading_rad, 0.5, epsilon = 1e-3);

        // Gyro still reads zero, the corrected heading holds through updates
        est.update(0.0, positions(0.0, 0.0));
        assert_abs_diff_eq!(est.get_pose().heading_rad, 0.5, epsilon = 1e-3);
    }
}
