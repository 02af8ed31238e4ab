//! # Teleop
//!
//! Shapes the operator's joystick axes into a chassis velocity request.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
pub use params::Params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tc::input::OperatorInput;
use nalgebra::Vector2;
use util::maths::signed_square;

use crate::loco_ctrl::ChassisVelocity;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Converts raw axes into a field-frame velocity request. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct InputShaper {
    params: Params,
    max_trans_speed_ms: f64,
    max_ang_speed_rads: f64,
}

/// Operator axes in the drive convention: +x forward, +y left, +z anticlockwise.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct DriveAxes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub boost: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl InputShaper {
    pub fn new(params: Params, max_trans_speed_ms: f64, max_ang_speed_rads: f64) -> Self {
        Self {
            params,
            max_trans_speed_ms,
            max_ang_speed_rads,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Shape the given axes into a velocity.
    pub fn shape(&self, axes: &DriveAxes) -> ChassisVelocity {
        let x = signed_square(deadzone(axes.x, self.params.translation_deadzone));
        let y = signed_square(deadzone(axes.y, self.params.translation_deadzone));
        let z = signed_square(deadzone(axes.z, self.params.rotation_deadzone));

        let mut trans = Vector2::new(x, y) * self.max_trans_speed_ms;
        if !axes.boost {
            trans *= self.params.translation_gain;
        }

        let omega = z * self.max_ang_speed_rads * self.params.rotation_gain;

        ChassisVelocity::new(trans[0], trans[1], omega)
    }

    /// Shape the translation axes only, leaving rotation at zero.
    pub fn shape_translation(&self, axes: &DriveAxes) -> ChassisVelocity {
        self.shape(&DriveAxes { z: 0.0, ..*axes })
    }

    /// True if the operator is commanding rotation hard enough to override automatic heading
    /// control.
    pub fn rotation_override(&self, input: &OperatorInput) -> bool {
        input.right_x.abs() > self.params.override_threshold
    }
}

impl DriveAxes {
    /// Map the controller: left stick translates, right stick X rotates, left bumper boosts.
    pub fn from_input(input: &OperatorInput) -> Self {
        Self {
            x: -input.left_y,
            y: -input.left_x,
            z: -input.right_x,
            boost: input.buttons.left_bumper,
        }
    }
}

/// Zero values whose magnitude is at or below the threshold.
fn deadzone(value: f64, threshold: f64) -> f64 {
    if value.abs() <= threshold {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn shaper() -> InputShaper {
        InputShaper::new(Params::default(), 4.0, 10.0)
    }

    fn axes(x: f64, y: f64, z: f64, boost: bool) -> DriveAxes {
        DriveAxes { x, y, z, boost }
    }

    #[test]
    fn test_zero_input() {
        assert!(shaper().shape(&DriveAxes::default()).is_zero());
    }

    #[test]
    fn test_deadzone_inclusive() {
        let v = shaper().shape(&axes(0.1, -0.1, 0.1, false));
        assert!(v.is_zero());
    }

    #[test]
    fn test_full_stick() {
        let s = shaper();
        let v = s.shape(&axes(1.0, 0.0, -1.0, false));
        assert_abs_diff_eq!(v.vx_ms, 4.0 * 0.6);
        assert_abs_diff_eq!(v.omega_rads, -10.0 * 0.8);

        let v = s.shape(&axes(1.0, 0.0, 0.0, true));
        assert_abs_diff_eq!(v.vx_ms, 4.0);
    }

    #[test]
    fn test_input_mapping() {
        let mut input = OperatorInput::default();
        input.left_y = -1.0;
        input.left_x = 0.5;
        input.right_x = 0.3;
        input.buttons.left_bumper = true;

        let a = DriveAxes::from_input(&input);
        assert_eq!(a, axes(1.0, -0.5, -0.3, true));
    }

    #[test]
    fn test_rotation_override() {
        let s = shaper();
        let mut input = OperatorInput::default();
        input.right_x = -0.2;
        assert!(!s.rotation_override(&input));
        input.right_x = -0.25;
        assert!(s.rotation_override(&input));
    }

    proptest! {
        #[test]
        fn test_below_deadzone_is_zero(v in -0.1f64..=0.1) {
            let out = shaper().shape(&axes(v, v, v, false));
            prop_assert!(out.is_zero());
        }

        #[test]
        fn test_odd_symmetry(v in -1.0f64..=1.0) {
            let s = shaper();
            let pos = s.shape(&axes(v, v, v, false));
            let neg = s.shape(&axes(-v, -v, -v, false));

            prop_assert_eq!(pos.vx_ms, -neg.vx_ms);
            prop_assert_eq!(pos.vy_ms, -neg.vy_ms);
            prop_assert_eq!(pos.omega_rads, -neg.omega_rads);
        }

        #[test]
        fn test_monotonic(a in -1.0f64..=1.0, b in -1.0f64..=1.0) {
            let s = shaper();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let v_lo = s.shape(&axes(lo, 0.0, lo, false));
            let v_hi = s.shape(&axes(hi, 0.0, hi, false));

            prop_assert!(v_lo.vx_ms <= v_hi.vx_ms);
            prop_assert!(v_lo.omega_rads <= v_hi.omega_rads);
        }
    }
}
