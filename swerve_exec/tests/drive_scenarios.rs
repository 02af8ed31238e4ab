//! End to end scenarios running the robot against the simulated drivetrain.

use std::{f64::consts::FRAC_PI_2, rc::Rc};

use approx::assert_abs_diff_eq;
use comms_if::{
    eqpt::mech::MechId,
    tc::{RobotMode, Tc},
};
use swerve_lib::{
    cmd::drive,
    loc::Pose,
    robot::{Robot, RobotParams},
    sim_client::SimWorld,
    tm_server::{MemorySink, TmServer},
    traj_ctrl::{PathLibrary, TrajectorySource},
};

fn params() -> RobotParams {
    RobotParams::load_from_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/../params")).unwrap()
}

fn build(params: RobotParams) -> (SimWorld, Robot) {
    let world = SimWorld::new(params.loco_ctrl.module_pos_m_rb, params.loco_ctrl.tick_period_s);
    let [x, y, h] = params.loc.initial_pose;
    world.set_pose(Pose::new(x, y, h));

    let robot = Robot::new(
        params,
        world.equipment(),
        TmServer::new(Box::new(MemorySink::new())),
    )
    .unwrap();

    (world, robot)
}

/// Step until `done` holds, failing after `max_ticks`.
fn run_until(world: &SimWorld, robot: &mut Robot, max_ticks: usize, done: impl Fn(&Robot) -> bool) {
    for _ in 0..max_ticks {
        if done(robot) {
            return;
        }
        robot.step();
        world.step();
    }
    panic!("Scenario did not complete within {} ticks", max_ticks);
}

#[test]
fn test_drive_to_pose_on_the_fly() {
    let mut params = params();
    params.loc.initial_pose = [4.0, 4.0, 0.0];
    let (world, mut robot) = build(params);

    robot.handle_tc(&Tc::SetMode(RobotMode::Test));

    let goal = Pose::new(8.0, 4.0, FRAC_PI_2);
    let source: Rc<dyn TrajectorySource> = Rc::new(PathLibrary::new());
    let id = robot.schedule(&drive::drive_to_pose(source, goal));

    run_until(&world, &mut robot, 1000, |r| !r.scheduler().is_running(id));

    let pose = robot.ds.pose();
    assert!(pose.distance(&goal) <= robot.ds.traj_params.pos_tolerance_m);
    assert!(pose.heading_error(&goal).abs() <= robot.ds.traj_params.heading_tolerance_rad);
    assert!(robot.ds.loco_ctrl.commanded_velocity().is_zero());
    assert!(robot.ds.active_path.is_none());

    // Odometry agrees with the simulated platform
    assert!(world.pose().distance(&pose) < 0.05);
}

#[test]
fn test_taxi_routine_through_modes() {
    let mut params = params();
    params.loc.initial_pose = [0.72, 6.68, 1.05];
    let (world, mut robot) = build(params);

    robot.handle_tc(&Tc::SelectRoutine("shootTaxiLeft".into()));
    robot.handle_tc(&Tc::SetMode(RobotMode::Autonomous));
    assert!(robot.is_routine_running());

    run_until(&world, &mut robot, 1000, |r| !r.is_routine_running());

    let end = Pose::new(3.0, 7.2, 0.0);
    assert!(robot.ds.pose().distance(&end) <= robot.ds.traj_params.pos_tolerance_m);
    assert_abs_diff_eq!(world.mech_demand(MechId::Flywheels), 0.0);

    // Nothing owns the drivetrain, so it stays at rest
    robot.step();
    world.step();
    assert!(robot.ds.loco_ctrl.commanded_velocity().is_zero());

    robot.handle_tc(&Tc::SetMode(RobotMode::Teleop));
    robot.step();
    assert_eq!(robot.scheduler().running(), vec!["TeleopDrive".to_string()]);

    robot.handle_tc(&Tc::SetMode(RobotMode::Disabled));
    assert!(robot.scheduler().running().is_empty());
    assert!(!world.is_brake_on());
}

#[test]
fn test_four_note_completes() {
    let mut params = params();
    params.loc.initial_pose = [1.37, 5.55, 0.0];
    let (world, mut robot) = build(params);

    robot.handle_tc(&Tc::SelectRoutine("fourNote".into()));
    robot.handle_tc(&Tc::SetMode(RobotMode::Autonomous));

    run_until(&world, &mut robot, 1500, |r| !r.is_routine_running());

    assert_eq!(robot.scheduler().num_nodes(), 0);
    assert_abs_diff_eq!(world.mech_demand(MechId::Flywheels), 0.0);
    assert_abs_diff_eq!(world.mech_demand(MechId::IntakeRollers), 0.0);
    assert_abs_diff_eq!(world.mech_demand(MechId::IntakePivot), 0.0);
}
