//! Swerve kinematics
//!
//! Module order is fixed as [`Corner::ALL`] everywhere in this file, rows `2i` and `2i + 1` of
//! the kinematics matrix belong to module `i`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::swerve::{ModulePosition, ModuleState, NUM_MODULES};
use nalgebra::{SMatrix, SVector};

use super::{ChassisVelocity, LocoCtrlError};
use crate::loc::Twist;

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

type InvMatrix = SMatrix<f64, { 2 * NUM_MODULES }, 3>;
type FwdMatrix = SMatrix<f64, 3, { 2 * NUM_MODULES }>;
type ModuleVector = SVector<f64, { 2 * NUM_MODULES }>;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Converts between chassis velocity and module states for a fixed module layout.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    module_pos_m_rb: [[f64; 2]; NUM_MODULES],
    inverse: InvMatrix,
    forward: FwdMatrix,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveKinematics {
    /// Build the kinematics from the module positions in the chassis frame.
    pub fn new(module_pos_m_rb: [[f64; 2]; NUM_MODULES]) -> Result<Self, LocoCtrlError> {
        let mut inverse = InvMatrix::zeros();

        for (i, pos) in module_pos_m_rb.iter().enumerate() {
            inverse[(2 * i, 0)] = 1.0;
            inverse[(2 * i, 2)] = -pos[1];
            inverse[(2 * i + 1, 1)] = 1.0;
            inverse[(2 * i + 1, 2)] = pos[0];
        }

        if inverse.rank(1e-9) < 3 {
            return Err(LocoCtrlError::InvalidGeometry(
                "module layout cannot resolve every chassis motion".into(),
            ));
        }

        let forward = inverse
            .pseudo_inverse(1e-9)
            .map_err(|e| LocoCtrlError::InvalidGeometry(e.to_string()))?;

        Ok(Self {
            module_pos_m_rb,
            inverse,
            forward,
        })
    }

    pub fn module_positions_m_rb(&self) -> &[[f64; 2]; NUM_MODULES] {
        &self.module_pos_m_rb
    }

    /// Module targets required to achieve the given chassis velocity.
    ///
    /// A module with zero speed is pointed at 0 rad, callers that care about holding the
    /// previous angle must do so themselves.
    pub fn to_module_states(&self, vel: &ChassisVelocity) -> [ModuleState; NUM_MODULES] {
        let chassis = SVector::<f64, 3>::new(vel.vx_ms, vel.vy_ms, vel.omega_rads);
        let module_vel = self.inverse * chassis;

        let mut states = [ModuleState::default(); NUM_MODULES];
        for (i, state) in states.iter_mut().enumerate() {
            let vx = module_vel[2 * i];
            let vy = module_vel[2 * i + 1];
            let speed = vx.hypot(vy);

            state.speed_ms = speed;
            state.angle_rad = if speed > 0.0 { vy.atan2(vx) } else { 0.0 };
        }

        states
    }

    /// Least-squares chassis velocity which best explains the given module states.
    pub fn to_chassis_velocity(&self, states: &[ModuleState; NUM_MODULES]) -> ChassisVelocity {
        let mut module_vel = ModuleVector::zeros();

        for (i, s) in states.iter().enumerate() {
            module_vel[2 * i] = s.speed_ms * s.angle_rad.cos();
            module_vel[2 * i + 1] = s.speed_ms * s.angle_rad.sin();
        }

        let chassis = self.forward * module_vel;
        ChassisVelocity::new(chassis[0], chassis[1], chassis[2])
    }

    /// Chassis-frame motion between two sets of module positions.
    ///
    /// The end angle of each module is taken as its direction of travel over the interval.
    pub fn to_twist(
        &self,
        start: &[ModulePosition; NUM_MODULES],
        end: &[ModulePosition; NUM_MODULES],
    ) -> Twist {
        let mut module_delta = ModuleVector::zeros();

        for i in 0..NUM_MODULES {
            let dist = end[i].distance_m - start[i].distance_m;
            module_delta[2 * i] = dist * end[i].angle_rad.cos();
            module_delta[2 * i + 1] = dist * end[i].angle_rad.sin();
        }

        let chassis = self.forward * module_delta;
        Twist {
            dx_m: chassis[0],
            dy_m: chassis[1],
            dtheta_rad: chassis[2],
        }
    }
}

/// Scale every module speed down by the same factor so that none exceeds `max_speed_ms`.
///
/// Returns true if any scaling was applied.
pub fn desaturate(states: &mut [ModuleState; NUM_MODULES], max_speed_ms: f64) -> bool {
    let fastest = states
        .iter()
        .map(|s| s.speed_ms.abs())
        .fold(0.0, f64::max);

    if fastest <= max_speed_ms || fastest == 0.0 {
        return false;
    }

    let scale = max_speed_ms / fastest;
    for s in states.iter_mut() {
        s.speed_ms *= scale;
    }

    true
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    const LAYOUT: [[f64; 2]; NUM_MODULES] =
        [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]];

    fn kin() -> SwerveKinematics {
        SwerveKinematics::new(LAYOUT).unwrap()
    }

    #[test]
    fn test_pure_translation() {
        let states = kin().to_module_states(&ChassisVelocity::new(0.0, 1.0, 0.0));

        for s in states.iter() {
            assert_abs_diff_eq!(s.speed_ms, 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(s.angle_rad, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_pure_rotation() {
        let states = kin().to_module_states(&ChassisVelocity::new(0.0, 0.0, 1.0));
        let r = 0.3f64.hypot(0.3);

        // Front left module moves backwards and to the left
        assert_abs_diff_eq!(states[0].speed_ms, r, epsilon = 1e-12);
        assert_abs_diff_eq!(states[0].angle_rad, 3.0 * std::f64::consts::FRAC_PI_4, epsilon = 1e-12);

        // Back right moves forwards and to the right
        assert_abs_diff_eq!(states[3].angle_rad, -std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn test_twist_from_positions() {
        let k = kin();
        let start = [ModulePosition::default(); NUM_MODULES];
        let mut end = start;
        for e in end.iter_mut() {
            e.distance_m = 0.5;
        }

        let twist = k.to_twist(&start, &end);
        assert_abs_diff_eq!(twist.dx_m, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(twist.dy_m, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(twist.dtheta_rad, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_desaturate_no_change_within_limit() {
        let mut states = kin().to_module_states(&ChassisVelocity::new(1.0, 0.0, 0.0));
        assert!(!desaturate(&mut states, 4.0));
        assert_abs_diff_eq!(states[0].speed_ms, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_geometry() {
        // Every module at the centre cannot observe rotation
        assert!(SwerveKinematics::new([[0.0, 0.0]; NUM_MODULES]).is_err());
    }

    proptest! {
        #[test]
        fn test_round_trip(
            vx in -4.0f64..4.0,
            vy in -4.0f64..4.0,
            omega in -8.0f64..8.0
        ) {
            let k = kin();
            let vel = ChassisVelocity::new(vx, vy, omega);
            let back = k.to_chassis_velocity(&k.to_module_states(&vel));

            prop_assert!((back.vx_ms - vx).abs() < 1e-9);
            prop_assert!((back.vy_ms - vy).abs() < 1e-9);
            prop_assert!((back.omega_rads - omega).abs() < 1e-9);
        }

        #[test]
        fn test_desaturate_bound_and_ratio(
            vx in -20.0f64..20.0,
            vy in -20.0f64..20.0,
            omega in -40.0f64..40.0,
            max in 0.5f64..6.0
        ) {
            let mut states = kin().to_module_states(&ChassisVelocity::new(vx, vy, omega));
            let before = states;
            desaturate(&mut states, max);

            for s in states.iter() {
                prop_assert!(s.speed_ms <= max + 1e-9);
            }

            for i in 0..NUM_MODULES {
                for j in 0..NUM_MODULES {
                    let lhs = before[i].speed_ms * states[j].speed_ms;
                    let rhs = before[j].speed_ms * states[i].speed_ms;
                    prop_assert!((lhs - rhs).abs() < 1e-6);
                }
            }
        }
    }
}
