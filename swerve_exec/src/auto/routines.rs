//! # Routines
//!
//! The routines offered to the operator, composed from the drive and mechanism actions.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::rc::Rc;

use comms_if::eqpt::mech::MechId;
use log::info;

use super::{AutoError, MechParams, Params, RoutineRegistry};
use crate::{
    cmd::{self, drive, mech, Cmd},
    loc::Pose,
    traj_ctrl::{PathLibrary, TrajectorySource},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Routine that does nothing, always registered.
pub const NO_AUTO: &str = "No Auto";

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build every routine, taking named paths from `paths`.
pub fn build_routines(
    params: &Params,
    paths: Rc<PathLibrary>,
) -> Result<RoutineRegistry, AutoError> {
    let m = &params.mechs;
    let mut reg = RoutineRegistry::new();

    reg.register(NO_AUTO, cmd::wait(0.0))?;

    // Legs of the four note routine, each intaking while it drives
    let mut four_note = auto_shoot(m);
    for leg in ["fourNote1", "fourNote2", "fourNote3"].iter() {
        four_note = four_note
            .and_then(
                drive::follow_path(&*paths, leg, true)?
                    .along_with(auto_intake(m).with_timeout(m.intake_timeout_s))?,
            )
            .and_then(auto_shoot(m));
    }
    let four_note = spin_flywheels(m).race_with(cmd::wait(m.spin_up_s).and_then(four_note))?;
    reg.register("fourNote", unlatch_intake(m).and_then(four_note))?;

    reg.register(
        "test",
        drive::follow_path(&*paths, "testIntake", true)?
            .and_then(cmd::print("Finished swerve"))
            .and_then(cmd::wait(1.0))
            .and_then(shoot_speaker(m)?)
            .and_then(cmd::print("Made shot")),
    )?;

    for side in ["shootTaxiLeft", "shootTaxiRight"].iter() {
        reg.register(
            side,
            spin_flywheels(m).race_with(
                cmd::wait(m.spin_up_s).and_then(drive::follow_path(&*paths, side, true)?),
            )?,
        )?;
    }

    reg.register("shootOnly", spin_flywheels(m))?;

    let [x, y, h] = params.center_goal;
    let source: Rc<dyn TrajectorySource> = paths;
    reg.register("driveToCenter", drive::drive_to_pose(source, Pose::new(x, y, h)))?;

    info!("Registered {} autonomous routines", reg.len());

    Ok(reg)
}

/// Run the flywheels at shooting speed until cancelled.
fn spin_flywheels(m: &MechParams) -> Cmd {
    mech::run(MechId::Flywheels, m.flywheel_shoot_demand)
}

/// Run the rollers to pick up a note until cancelled.
fn auto_intake(m: &MechParams) -> Cmd {
    mech::run(MechId::IntakeRollers, m.intake_roller_demand)
}

/// Feed a note into already spinning flywheels.
///
/// Only the rollers are commanded so this can run inside a race that owns the flywheels.
fn auto_shoot(m: &MechParams) -> Cmd {
    let feed = mech::run(MechId::IntakeRollers, m.feed_roller_demand).with_timeout(m.feed_time_s);
    mech::wait_at_target(MechId::Flywheels).and_then(feed)
}

/// Spin up, shoot, then stop the flywheels.
fn shoot_speaker(m: &MechParams) -> Result<Cmd, AutoError> {
    Ok(spin_flywheels(m).race_with(auto_shoot(m))?)
}

/// Kick the intake pivot towards deployed to free it, then bring it home.
fn unlatch_intake(m: &MechParams) -> Cmd {
    mech::move_to(MechId::IntakePivot, m.pivot_deployed_rad)
        .with_timeout(m.pivot_unlatch_s)
        .and_then(mech::move_to(MechId::IntakePivot, m.pivot_home_rad))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{cmd::Resource, traj_ctrl::{PathParams, TrajConstraints}};
    use std::collections::BTreeMap;

    fn test_params() -> Params {
        let constraints = TrajConstraints {
            max_vel_ms: 2.0,
            max_accel_mss: 3.0,
            max_ang_vel_rads: 4.0,
            max_ang_accel_radss: 8.0,
        };
        let path = |pts: Vec<[f64; 2]>| PathParams {
            waypoints_m: pts,
            start_heading_rad: 0.0,
            end_heading_rad: 0.0,
            end_velocity_ms: 0.0,
            constraints,
        };

        let mut paths = BTreeMap::new();
        paths.insert("fourNote1".to_string(), path(vec![[1.4, 5.5], [2.6, 5.5]]));
        paths.insert("fourNote2".to_string(), path(vec![[2.6, 5.5], [2.6, 7.0]]));
        paths.insert("fourNote3".to_string(), path(vec![[2.6, 7.0], [2.6, 4.1]]));
        paths.insert("shootTaxiLeft".to_string(), path(vec![[0.7, 6.7], [3.0, 7.2]]));
        paths.insert("shootTaxiRight".to_string(), path(vec![[0.7, 4.4], [3.0, 3.5]]));
        paths.insert("testIntake".to_string(), path(vec![[1.4, 5.5], [2.4, 5.5]]));

        Params {
            default_routine: NO_AUTO.to_string(),
            paths,
            center_goal: [8.27, 4.1, 0.0],
            mechs: MechParams::default(),
        }
    }

    #[test]
    fn test_all_routines_build() {
        let params = test_params();
        let paths = Rc::new(PathLibrary::from_params(&params.paths).unwrap());
        let reg = build_routines(&params, paths).unwrap();

        assert_eq!(
            reg.names(),
            vec![
                "No Auto",
                "fourNote",
                "test",
                "shootTaxiLeft",
                "shootTaxiRight",
                "shootOnly",
                "driveToCenter"
            ]
        );

        let four_note = reg.get("fourNote").unwrap().requirements();
        assert!(four_note.contains(&Resource::Drivetrain));
        assert!(four_note.contains(&Resource::Mech(MechId::Flywheels)));
        assert!(four_note.contains(&Resource::Mech(MechId::IntakePivot)));

        assert!(!reg.get("shootOnly").unwrap().requirements().contains(&Resource::Drivetrain));
        assert!(reg.get("driveToCenter").unwrap().requirements().contains(&Resource::Drivetrain));
    }

    #[test]
    fn test_missing_path() {
        let mut params = test_params();
        params.paths.remove("fourNote2");
        let paths = Rc::new(PathLibrary::from_params(&params.paths).unwrap());

        assert!(matches!(
            build_routines(&params, paths),
            Err(AutoError::PathError(_))
        ));
    }
}
