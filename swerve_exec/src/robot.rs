//! # Robot
//!
//! Owns the data store, the scheduler and the routines, and runs the control core one tick at a
//! time. Each tick:
//!
//! 1. Latch the operator input and read the drivetrain sensors
//! 2. Update the pose estimate, folding in any absolute pose observation
//! 3. Evaluate the operator bindings (teleop only)
//! 4. Tick the scheduler
//! 5. Publish telemetry
//! 6. Check for actuator faults

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{collections::BTreeMap, path::Path, rc::Rc};

use comms_if::{
    eqpt::{
        mech::{MechId, Mechanism},
        swerve::{Gyro, SwerveModule, NUM_MODULES},
        vision::PoseSource,
    },
    tc::{
        input::{OperatorInput, Trigger},
        RobotMode, Tc,
    },
};
use log::{info, warn};
use serde::de::DeserializeOwned;
use util::params::LoadError;

use crate::{
    auto::{self, build_routines, AutoError, RoutineRegistry, RoutineSelector},
    cmd::{drive, ActionId, Cmd, Resource, Scheduler},
    data_store::{DataStore, SafeModeCause},
    heading_ctrl,
    loc::{self, Pose, PoseEstimator},
    loco_ctrl::{self, ChassisVelocity, LocoCtrl, LocoCtrlError},
    teleop::{self, InputShaper},
    tm_server::TmServer,
    traj_ctrl::{self, PathLibrary, TrajError, TrajectorySource},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Every parameter set the robot needs.
#[derive(Debug, Clone)]
pub struct RobotParams {
    pub loco_ctrl: loco_ctrl::Params,
    pub teleop: teleop::Params,
    pub heading_ctrl: heading_ctrl::Params,
    pub traj_ctrl: traj_ctrl::Params,
    pub loc: loc::Params,
    pub auto: auto::Params,
}

/// The hardware the robot drives.
pub struct Equipment {
    /// In `Corner::ALL` order.
    pub modules: [Box<dyn SwerveModule>; NUM_MODULES],
    pub gyro: Box<dyn Gyro>,
    pub mechs: BTreeMap<MechId, Box<dyn Mechanism>>,
    pub pose_source: Option<Box<dyn PoseSource>>,
}

pub struct Robot {
    pub ds: DataStore,
    scheduler: Scheduler,
    registry: RoutineRegistry,
    selector: RoutineSelector,
    paths: Rc<PathLibrary>,

    /// Input to be latched at the start of the next tick.
    pending_input: OperatorInput,

    /// The routine scheduled on entering autonomous.
    auto_cmd: Option<ActionId>,

    x_config_cmd: Option<ActionId>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    #[error("Could not load parameter file {0}: {1}")]
    ParamLoadError(String, LoadError),

    #[error("Could not initialise the drivetrain: {0}")]
    LocoCtrlError(#[from] LocoCtrlError),

    #[error("Could not build the path library: {0}")]
    PathError(#[from] TrajError),

    #[error("Could not build the autonomous routines: {0}")]
    AutoError(#[from] AutoError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RobotParams {
    /// Load every parameter file from the `params` directory under the software root.
    pub fn load() -> Result<Self, RobotError> {
        Self::load_impl(None)
    }

    /// Load every parameter file from the given directory.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, RobotError> {
        Self::load_impl(Some(dir.as_ref()))
    }

    fn load_impl(dir: Option<&Path>) -> Result<Self, RobotError> {
        Ok(Self {
            loco_ctrl: load_file(dir, "loco_ctrl.toml")?,
            teleop: load_file(dir, "teleop.toml")?,
            heading_ctrl: load_file(dir, "heading_ctrl.toml")?,
            traj_ctrl: load_file(dir, "traj_ctrl.toml")?,
            loc: load_file(dir, "loc.toml")?,
            auto: load_file(dir, "auto.toml")?,
        })
    }
}

impl Robot {
    /// Build the robot around the given equipment, starting disabled.
    pub fn new(params: RobotParams, eqpt: Equipment, tm: TmServer) -> Result<Self, RobotError> {
        let loco_ctrl = LocoCtrl::new(params.loco_ctrl.clone(), eqpt.modules, eqpt.gyro)?;
        info!("LocoCtrl init complete");

        let loc = PoseEstimator::new(
            params.loc.clone(),
            loco_ctrl.kinematics().clone(),
            loco_ctrl.raw_gyro_heading(),
            loco_ctrl.module_positions(),
        );
        info!("Pose estimator init complete");

        let shaper = InputShaper::new(
            params.teleop.clone(),
            params.loco_ctrl.max_trans_speed_ms,
            params.loco_ctrl.max_ang_speed_rads,
        );

        let paths = Rc::new(PathLibrary::from_params(&params.auto.paths)?);
        let registry = build_routines(&params.auto, paths.clone())?;
        let selector = RoutineSelector::new(&registry, &params.auto.default_routine)?;
        info!(
            "Autonomous routines: {:?}, default {}",
            selector.names(),
            selector.default_routine()
        );

        let mut ds = DataStore::new(
            loco_ctrl,
            loc,
            shaper,
            params.heading_ctrl,
            params.traj_ctrl,
            tm,
        );
        ds.mechs = eqpt.mechs;
        ds.pose_source = eqpt.pose_source;

        let mut robot = Self {
            ds,
            scheduler: Scheduler::new(),
            registry,
            selector,
            paths,
            pending_input: OperatorInput::default(),
            auto_cmd: None,
            x_config_cmd: None,
        };

        // Coast until enabled
        robot.ds.loco_ctrl.set_brake_mode(false);

        Ok(robot)
    }

    pub fn mode(&self) -> RobotMode {
        self.ds.mode
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn selector(&self) -> &RoutineSelector {
        &self.selector
    }

    /// Access the selector, e.g. to register change listeners.
    pub fn selector_mut(&mut self) -> &mut RoutineSelector {
        &mut self.selector
    }

    /// True while the routine scheduled on entering autonomous is still running.
    pub fn is_routine_running(&self) -> bool {
        self.auto_cmd.map_or(false, |id| self.scheduler.is_running(id))
    }

    /// Execute a telecommand.
    ///
    /// While in safe mode only `MakeUnsafe`, routine selection and operator input are accepted.
    pub fn handle_tc(&mut self, tc: &Tc) {
        match tc {
            Tc::MakeSafe => {
                self.ds.make_safe(SafeModeCause::MakeSafeTc);
                self.scheduler.cancel_all(&mut self.ds);
            }
            Tc::MakeUnsafe => {
                self.ds.make_unsafe(SafeModeCause::MakeSafeTc);
            }
            Tc::SetMode(_) if self.ds.safe => {
                warn!("Cannot change mode while in safe mode, rejecting {:?}", tc);
            }
            Tc::SetMode(m) => self.set_mode(*m),
            Tc::SelectRoutine(name) => {
                if let Err(e) = self.selector.select(name) {
                    warn!("Could not select routine: {}", e);
                }
            }
            Tc::Input(input) => self.pending_input = *input,
        }
    }

    /// Move to a new operating mode.
    ///
    /// Every running command is cancelled on a transition. Entering autonomous schedules the
    /// currently selected routine.
    pub fn set_mode(&mut self, mode: RobotMode) {
        if mode == self.ds.mode {
            return;
        }

        info!("Mode change: {:?} -> {:?}", self.ds.mode, mode);

        self.scheduler.cancel_all(&mut self.ds);
        self.scheduler.clear_default(Resource::Drivetrain);
        self.auto_cmd = None;
        self.x_config_cmd = None;

        self.ds.mode = mode;

        match mode {
            RobotMode::Disabled => {
                self.ds.loco_ctrl.stop();
                self.ds.loco_ctrl.set_brake_mode(false);
            }
            RobotMode::Autonomous => {
                self.ds.loco_ctrl.set_brake_mode(true);

                let name = self.selector.selected().to_string();
                match self.registry.get(&name).cloned() {
                    Some(routine) => {
                        info!("Starting autonomous routine {}", name);
                        self.auto_cmd = Some(self.scheduler.schedule(&routine, &mut self.ds));
                    }
                    None => warn!("Selected routine {} is not registered", name),
                }
            }
            RobotMode::Teleop => {
                self.ds.loco_ctrl.set_brake_mode(true);
                self.scheduler
                    .set_default(Resource::Drivetrain, drive::teleop_drive());
            }
            RobotMode::Test => {
                self.ds.loco_ctrl.set_brake_mode(true);
            }
        }
    }

    /// Schedule a command directly.
    pub fn schedule(&mut self, cmd: &Cmd) -> ActionId {
        self.scheduler.schedule(cmd, &mut self.ds)
    }

    /// Run one control tick.
    pub fn step(&mut self) {
        util::logger::set_tick(self.ds.num_cycles);
        self.ds.cycle_start(self.pending_input);

        self.update_pose();

        if self.ds.mode == RobotMode::Teleop && !self.ds.safe {
            self.eval_bindings();
        }

        if self.ds.safe {
            self.ds.loco_ctrl.stop();
        } else if self.ds.mode != RobotMode::Disabled {
            self.scheduler.tick(&mut self.ds);

            // Let the limiter bring an unowned drivetrain to rest
            if self.ds.mode == RobotMode::Autonomous
                && self.scheduler.owner(Resource::Drivetrain).is_none()
            {
                self.ds.loco_ctrl.drive(ChassisVelocity::zero(), false);
            }
        }

        self.write_tm();
        self.check_safety();

        self.ds.num_cycles += 1;
    }

    fn update_pose(&mut self) {
        let ds = &mut self.ds;

        ds.loc
            .update(ds.loco_ctrl.raw_gyro_heading(), ds.loco_ctrl.module_positions());

        if let Some(obs) = ds.pose_source.as_mut().and_then(|s| s.latest()) {
            ds.loc.add_correction(&Pose::from(obs), obs.confidence);
        }
    }

    fn eval_bindings(&mut self) {
        let input = self.ds.input;
        let prev = self.ds.prev_input;

        let lock_dirs = self.ds.heading_params.lock_directions_deg.clone();
        for dir in lock_dirs {
            if input.rising_edge(&prev, Trigger::Pov(dir)) {
                let cmd = drive::lock_heading(dir).until(rotation_override);
                self.scheduler.schedule(&cmd, &mut self.ds);
            }
        }

        if input.rising_edge(&prev, Trigger::A) {
            let cmd = drive::focus_point().until(rotation_override);
            self.scheduler.schedule(&cmd, &mut self.ds);
        }

        if input.rising_edge(&prev, Trigger::Y) {
            let [x, y, h] = self.ds.shaper.params().drive_to_pose;
            let source: Rc<dyn TrajectorySource> = self.paths.clone();
            let cmd = drive::drive_to_pose(source, Pose::new(x, y, h));
            self.scheduler.schedule(&cmd, &mut self.ds);
        }

        if input.rising_edge(&prev, Trigger::RightStick) {
            self.scheduler.schedule(&drive::zero_gyro(), &mut self.ds);
        }

        if input.rising_edge(&prev, Trigger::Start) {
            match self.x_config_cmd.filter(|id| self.scheduler.is_running(*id)) {
                Some(id) => {
                    self.scheduler.cancel(id, &mut self.ds);
                    self.x_config_cmd = None;
                }
                None => {
                    self.x_config_cmd =
                        Some(self.scheduler.schedule(&drive::x_config(), &mut self.ds));
                }
            }
        }
    }

    fn write_tm(&mut self) {
        let ds = &mut self.ds;

        ds.loco_ctrl.write_tm(&mut ds.tm);
        ds.loc.write_tm(&mut ds.tm);

        ds.tm.send_text("robot/mode", &format!("{:?}", ds.mode));
        ds.tm.send_flag("robot/safe", ds.safe);
        ds.tm.send_text("robot/routine", self.selector.selected());
        ds.tm
            .send_text("cmd/running", &self.scheduler.running().join(", "));

        if let Some(ref path) = ds.active_path {
            ds.tm.send_text("traj_ctrl/active_path", path);
        }
        if let Some(target) = ds.traj_target {
            ds.tm.send_pose("traj_ctrl/target_pose", target.to_array());
        }

        ds.tm.end_tick();
    }

    fn check_safety(&mut self) {
        if self.ds.loco_ctrl.has_actuator_fault() {
            if !self.ds.safe {
                log::error!("Communication with the drivetrain actuators lost");
            }
            self.ds.make_safe(SafeModeCause::ActuatorCommsLost);
            self.scheduler.cancel_all(&mut self.ds);
        } else if self.ds.safe_cause == Some(SafeModeCause::ActuatorCommsLost) {
            self.ds.make_unsafe(SafeModeCause::ActuatorCommsLost);
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// True when the operator takes back rotation control.
fn rotation_override(ds: &DataStore) -> bool {
    ds.shaper.rotation_override(&ds.input)
}

fn load_file<P: DeserializeOwned>(dir: Option<&Path>, file: &str) -> Result<P, RobotError> {
    match dir {
        Some(d) => util::params::load_from(d.join(file)),
        None => util::params::load(file),
    }
    .map_err(|e| RobotError::ParamLoadError(file.to_string(), e))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        sim_client::SimWorld,
        tm_server::MemorySink,
    };
    use approx::assert_abs_diff_eq;
    use comms_if::tm::TmValue;
    use std::f64::consts::FRAC_PI_2;

    fn setup() -> (SimWorld, Robot, MemorySink) {
        let params =
            RobotParams::load_from_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/../params")).unwrap();
        let world = SimWorld::new(params.loco_ctrl.module_pos_m_rb, params.loco_ctrl.tick_period_s);
        let sink = MemorySink::new();
        let robot = Robot::new(params, world.equipment(), TmServer::new(Box::new(sink.clone())))
            .unwrap();

        (world, robot, sink)
    }

    fn run(world: &SimWorld, robot: &mut Robot, ticks: usize) {
        for _ in 0..ticks {
            robot.step();
            world.step();
        }
    }

    fn input_tc(f: impl FnOnce(&mut OperatorInput)) -> Tc {
        let mut input = OperatorInput::default();
        f(&mut input);
        Tc::Input(input)
    }

    #[test]
    fn test_starts_disabled() {
        let (world, mut robot, sink) = setup();

        assert_eq!(robot.mode(), RobotMode::Disabled);
        assert!(!world.is_brake_on());
        assert_eq!(robot.selector().selected(), auto::NO_AUTO);

        // Operator input is ignored while disabled
        robot.handle_tc(&input_tc(|i| i.left_y = -1.0));
        run(&world, &mut robot, 10);

        assert!(robot.ds.loco_ctrl.commanded_velocity().is_zero());
        assert_eq!(sink.num_ticks(), 10);
        assert_eq!(
            sink.latest("robot/mode"),
            Some(TmValue::Text("Disabled".into()))
        );
    }

    #[test]
    fn test_auto_runs_selected_routine() {
        let (world, mut robot, _) = setup();

        robot.handle_tc(&Tc::SelectRoutine("shootOnly".into()));
        robot.handle_tc(&Tc::SetMode(RobotMode::Autonomous));
        assert!(world.is_brake_on());
        assert!(robot.is_routine_running());

        run(&world, &mut robot, 5);
        assert_eq!(robot.scheduler().running(), vec!["shootOnly".to_string()]);
        assert!(world.mech_demand(MechId::Flywheels) > 0.0);

        // Leaving autonomous cancels the routine
        robot.handle_tc(&Tc::SetMode(RobotMode::Teleop));
        assert!(!robot.is_routine_running());
        assert_eq!(world.mech_demand(MechId::Flywheels), 0.0);
    }

    #[test]
    fn test_no_auto_finishes() {
        let (world, mut robot, _) = setup();

        robot.handle_tc(&Tc::SetMode(RobotMode::Autonomous));
        run(&world, &mut robot, 2);

        assert!(!robot.is_routine_running());
        assert_eq!(robot.scheduler().num_nodes(), 0);
        assert!(robot.ds.loco_ctrl.commanded_velocity().is_zero());
    }

    #[test]
    fn test_unknown_routine_keeps_selection() {
        let (_, mut robot, _) = setup();

        robot.handle_tc(&Tc::SelectRoutine("fourNote".into()));
        robot.handle_tc(&Tc::SelectRoutine("sixNote".into()));

        assert_eq!(robot.selector().selected(), "fourNote");
    }

    #[test]
    fn test_teleop_drives() {
        let (world, mut robot, _) = setup();

        robot.handle_tc(&Tc::SetMode(RobotMode::Teleop));
        robot.handle_tc(&input_tc(|i| i.left_y = -1.0));
        run(&world, &mut robot, 50);

        assert!(world.pose().x() > 0.5);
        assert_abs_diff_eq!(world.pose().y(), 0.0, epsilon = 1e-6);
        assert_eq!(robot.scheduler().running(), vec!["TeleopDrive".to_string()]);

        // Releasing the stick comes to rest
        robot.handle_tc(&input_tc(|_| ()));
        run(&world, &mut robot, 50);
        assert!(robot.ds.loco_ctrl.commanded_velocity().is_zero());
    }

    #[test]
    fn test_pov_locks_heading_until_override() {
        let (world, mut robot, _) = setup();

        robot.handle_tc(&Tc::SetMode(RobotMode::Teleop));
        robot.handle_tc(&input_tc(|i| i.pov_deg = Some(90)));
        run(&world, &mut robot, 1);
        robot.handle_tc(&input_tc(|_| ()));
        run(&world, &mut robot, 150);

        assert_abs_diff_eq!(robot.ds.pose().heading_rad, -FRAC_PI_2, epsilon = 0.02);
        assert!(robot.scheduler().running()[0].starts_with("LockHeading"));

        // Rotating by hand hands the drivetrain back to teleop
        robot.handle_tc(&input_tc(|i| i.right_x = 0.5));
        run(&world, &mut robot, 2);
        assert_eq!(robot.scheduler().running(), vec!["TeleopDrive".to_string()]);
    }

    #[test]
    fn test_start_toggles_x_config() {
        let (world, mut robot, _) = setup();

        robot.handle_tc(&Tc::SetMode(RobotMode::Teleop));
        run(&world, &mut robot, 1);

        robot.handle_tc(&input_tc(|i| i.buttons.start = true));
        run(&world, &mut robot, 3);
        assert!(robot.ds.loco_ctrl.is_x_config());

        // Holding the button does not toggle again
        robot.handle_tc(&input_tc(|_| ()));
        run(&world, &mut robot, 1);
        assert!(robot.ds.loco_ctrl.is_x_config());

        robot.handle_tc(&input_tc(|i| i.buttons.start = true));
        run(&world, &mut robot, 2);
        assert!(!robot.ds.loco_ctrl.is_x_config());
        assert_eq!(robot.scheduler().running(), vec!["TeleopDrive".to_string()]);
    }

    #[test]
    fn test_make_safe_tc() {
        let (world, mut robot, sink) = setup();

        robot.handle_tc(&Tc::SelectRoutine("shootOnly".into()));
        robot.handle_tc(&Tc::SetMode(RobotMode::Autonomous));
        run(&world, &mut robot, 2);

        robot.handle_tc(&Tc::MakeSafe);
        assert!(robot.ds.safe);
        assert!(!robot.is_routine_running());

        // Mode changes are rejected while safe
        robot.handle_tc(&Tc::SetMode(RobotMode::Teleop));
        assert_eq!(robot.mode(), RobotMode::Autonomous);

        run(&world, &mut robot, 5);
        assert!(robot.ds.loco_ctrl.commanded_velocity().is_zero());
        assert_eq!(sink.latest("robot/safe"), Some(TmValue::Flag(true)));

        robot.handle_tc(&Tc::MakeUnsafe);
        assert!(!robot.ds.safe);
        robot.handle_tc(&Tc::SetMode(RobotMode::Teleop));
        assert_eq!(robot.mode(), RobotMode::Teleop);
    }

    #[test]
    fn test_comms_loss_recovers() {
        let (world, mut robot, _) = setup();

        robot.handle_tc(&Tc::SetMode(RobotMode::Teleop));
        robot.handle_tc(&input_tc(|i| i.left_y = -1.0));
        run(&world, &mut robot, 10);

        world.set_comms_lost(true);
        run(&world, &mut robot, 3);
        assert!(robot.ds.safe);
        assert_eq!(robot.ds.safe_cause, Some(SafeModeCause::ActuatorCommsLost));
        assert!(robot.scheduler().running().is_empty());

        world.set_comms_lost(false);
        run(&world, &mut robot, 1);
        assert!(!robot.ds.safe);

        // The teleop default comes back once the fault clears
        run(&world, &mut robot, 1);
        assert_eq!(robot.scheduler().running(), vec!["TeleopDrive".to_string()]);
    }

    #[test]
    fn test_zero_gyro_binding() {
        let (world, mut robot, _) = setup();

        world.set_heading(1.0);
        robot.handle_tc(&Tc::SetMode(RobotMode::Teleop));
        robot.handle_tc(&input_tc(|i| i.buttons.right_stick = true));
        run(&world, &mut robot, 2);

        assert_abs_diff_eq!(robot.ds.loco_ctrl.gyro_heading(), 0.0, epsilon = 1e-9);
    }
}
