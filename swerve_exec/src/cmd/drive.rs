//! # Drivetrain actions
//!
//! Every action here requires [`Resource::Drivetrain`] and stops the drivetrain when cancelled.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::rc::Rc;

use log::{info, warn};

use super::{defer, Cmd, Instant, Primitive, Resource};
use crate::{
    data_store::DataStore,
    heading_ctrl::{HeadingController, HeadingTarget},
    loc::Pose,
    loco_ctrl::ChassisVelocity,
    teleop::DriveAxes,
    traj_ctrl::{HolonomicController, Trajectory, TrajectorySource},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Field oriented driving from the operator's sticks. Never finishes.
#[derive(Debug, Clone)]
pub struct TeleopDrive;

/// Operator translation with the rotation under closed loop heading control. Never finishes.
#[derive(Debug, Clone)]
pub struct HeadingDrive {
    /// `None` aims at the configured focus point.
    target: Option<HeadingTarget>,
    ctrl: Option<HeadingController>,
}

/// Follows a trajectory with pose feedback.
#[derive(Debug, Clone)]
pub struct FollowTrajectory {
    name: String,
    traj: Rc<Trajectory>,

    /// Reset the pose estimate to the start of the trajectory when starting.
    reset_pose: bool,

    ctrl: Option<HolonomicController>,
    elapsed_ticks: u64,
}

/// Holds the wheels in the X configuration. Never finishes.
#[derive(Debug, Clone)]
pub struct XConfig;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Primitive for TeleopDrive {
    fn name(&self) -> String {
        "TeleopDrive".into()
    }

    fn requirements(&self) -> Vec<Resource> {
        vec![Resource::Drivetrain]
    }

    fn periodic(&mut self, ds: &mut DataStore) {
        let axes = DriveAxes::from_input(&ds.input);
        let field = ds.shaper.shape(&axes);
        let vel = ds.loco_ctrl.field_to_robot(field);
        let closed_loop = ds.shaper.params().closed_loop;
        ds.loco_ctrl.drive(vel, closed_loop);
    }

    fn is_finished(&mut self, _ds: &mut DataStore) -> bool {
        false
    }

    fn cancel(&mut self, ds: &mut DataStore) {
        ds.loco_ctrl.stop();
    }
}

impl Primitive for HeadingDrive {
    fn name(&self) -> String {
        match self.target {
            Some(HeadingTarget::Fixed { heading_rad }) => {
                format!("LockHeading({:.1} deg)", heading_rad.to_degrees())
            }
            _ => "FocusPoint".into(),
        }
    }

    fn requirements(&self) -> Vec<Resource> {
        vec![Resource::Drivetrain]
    }

    fn start(&mut self, ds: &mut DataStore) {
        let target = self
            .target
            .unwrap_or_else(|| HeadingTarget::focus(&ds.heading_params));
        let mut ctrl = HeadingController::new(&ds.heading_params, target, ds.tick_period_s);
        ctrl.start(ds.pose().heading_rad, ds.loco_ctrl.gyro_yaw_rate());
        self.ctrl = Some(ctrl);
    }

    fn periodic(&mut self, ds: &mut DataStore) {
        let ctrl = match self.ctrl.as_mut() {
            Some(c) => c,
            None => return,
        };

        let trans = ds.shaper.shape_translation(&DriveAxes::from_input(&ds.input));
        let omega = ctrl.calculate(&ds.pose());
        let field = ChassisVelocity::new(trans.vx_ms, trans.vy_ms, omega);

        let vel = ds.loco_ctrl.field_to_robot(field);
        let closed_loop = ds.shaper.params().closed_loop;
        ds.loco_ctrl.drive(vel, closed_loop);
    }

    fn is_finished(&mut self, _ds: &mut DataStore) -> bool {
        false
    }

    fn cancel(&mut self, ds: &mut DataStore) {
        self.ctrl = None;
        ds.loco_ctrl.stop();
    }
}

impl FollowTrajectory {
    pub fn new(name: &str, traj: Rc<Trajectory>, reset_pose: bool) -> Self {
        Self {
            name: name.to_string(),
            traj,
            reset_pose,
            ctrl: None,
            elapsed_ticks: 0,
        }
    }

    fn elapsed_s(&self, ds: &DataStore) -> f64 {
        self.elapsed_ticks as f64 * ds.tick_period_s
    }

    fn clear(&self, ds: &mut DataStore) {
        ds.active_path = None;
        ds.traj_target = None;
    }
}

impl Primitive for FollowTrajectory {
    fn name(&self) -> String {
        format!("FollowTrajectory({})", self.name)
    }

    fn requirements(&self) -> Vec<Resource> {
        vec![Resource::Drivetrain]
    }

    fn start(&mut self, ds: &mut DataStore) {
        if self.reset_pose {
            ds.reset_pose(self.traj.initial_pose());
        }

        let mut ctrl = HolonomicController::new(&ds.traj_params, ds.tick_period_s);
        ctrl.reset();
        self.ctrl = Some(ctrl);
        self.elapsed_ticks = 0;

        ds.active_path = Some(self.name.clone());
        info!(
            "Following {} ({:.2} m, {:.2} s)",
            self.name,
            self.traj.length_m(),
            self.traj.duration_s()
        );
    }

    fn periodic(&mut self, ds: &mut DataStore) {
        let t = self.elapsed_s(ds);
        let ctrl = match self.ctrl.as_mut() {
            Some(c) => c,
            None => return,
        };

        let sample = self.traj.sample(t);
        let vel = ctrl.calculate(&ds.pose(), &sample);

        ds.traj_target = Some(sample.pose);
        ds.loco_ctrl.drive(vel, true);

        self.elapsed_ticks += 1;
    }

    fn is_finished(&mut self, ds: &mut DataStore) -> bool {
        let t = self.elapsed_s(ds);
        let duration = self.traj.duration_s();

        if t < duration {
            return false;
        }

        if !ds.traj_params.require_end_tolerance {
            return true;
        }

        let at_end = match self.ctrl {
            Some(ref c) => c.at_reference(&ds.pose(), &self.traj.end_pose()),
            None => true,
        };

        if !at_end && t >= duration + ds.traj_params.max_overrun_s {
            warn!(
                "{} did not settle within tolerance after {:.2} s, finishing anyway",
                self.name, t
            );
            return true;
        }

        at_end
    }

    fn finish(&mut self, ds: &mut DataStore) {
        info!("Finished {}", self.name);
        if self.traj.end_state().velocity_ms == 0.0 {
            ds.loco_ctrl.stop();
        }
        self.clear(ds);
    }

    fn cancel(&mut self, ds: &mut DataStore) {
        ds.loco_ctrl.stop();
        self.clear(ds);
    }
}

impl Primitive for XConfig {
    fn name(&self) -> String {
        "XConfig".into()
    }

    fn requirements(&self) -> Vec<Resource> {
        vec![Resource::Drivetrain]
    }

    fn periodic(&mut self, ds: &mut DataStore) {
        ds.loco_ctrl.set_x_config();
    }

    fn is_finished(&mut self, _ds: &mut DataStore) -> bool {
        false
    }

    fn cancel(&mut self, ds: &mut DataStore) {
        ds.loco_ctrl.stop();
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

pub fn teleop_drive() -> Cmd {
    Cmd::primitive(TeleopDrive)
}

/// Hold the heading opposite to a d-pad direction while the operator translates.
pub fn lock_heading(direction_deg: u16) -> Cmd {
    Cmd::primitive(HeadingDrive {
        target: Some(HeadingTarget::from_pov(direction_deg)),
        ctrl: None,
    })
}

/// Keep the configured focus point in view while the operator translates.
pub fn focus_point() -> Cmd {
    Cmd::primitive(HeadingDrive {
        target: None,
        ctrl: None,
    })
}

/// Follow a named trajectory, optionally resetting the pose estimate to its start first.
pub fn follow_path(
    source: &dyn TrajectorySource,
    name: &str,
    reset_pose: bool,
) -> Result<Cmd, crate::traj_ctrl::TrajError> {
    let traj = source.get(name)?;
    Ok(Cmd::primitive(FollowTrajectory::new(name, traj, reset_pose)))
}

/// Drive to `goal` along a trajectory generated from wherever the robot is when this starts.
///
/// If no trajectory can be generated the drivetrain is stopped and the action finishes.
pub fn drive_to_pose(source: Rc<dyn TrajectorySource>, goal: Pose) -> Cmd {
    defer(&[Resource::Drivetrain], move |ds| {
        let start = ds.pose();
        match source.generate(&start, &goal, ds.traj_params.on_the_fly) {
            Ok(traj) => Cmd::primitive(FollowTrajectory::new("on the fly", Rc::new(traj), false)),
            Err(e) => {
                warn!(
                    "Could not generate a trajectory from {:?} to {:?}: {}",
                    start.to_array(),
                    goal.to_array(),
                    e
                );
                stop()
            }
        }
    })
    .named("DriveToPose")
}

/// Stop the drivetrain immediately.
pub fn stop() -> Cmd {
    Cmd::primitive(Instant::new("Stop", &[Resource::Drivetrain], |ds| {
        ds.loco_ctrl.stop()
    }))
}

pub fn x_config() -> Cmd {
    Cmd::primitive(XConfig)
}

pub fn zero_gyro() -> Cmd {
    Cmd::primitive(Instant::new("ZeroGyro", &[], |ds| ds.loco_ctrl.zero_gyro()))
}

/// Make the gyro's software zero agree with the estimated pose heading.
pub fn match_gyro_to_pose() -> Cmd {
    Cmd::primitive(Instant::new("MatchGyroToPose", &[], |ds| {
        let pose = ds.pose();
        ds.loco_ctrl.match_gyro_to_pose(&pose)
    }))
}

/// Reset the pose estimate to a known pose.
pub fn reset_pose(pose: Pose) -> Cmd {
    Cmd::primitive(Instant::new("ResetPose", &[], move |ds| {
        info!("Pose reset to {:?}", pose.to_array());
        ds.reset_pose(pose)
    }))
}
