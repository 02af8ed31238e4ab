//! # Data Store
//!
//! Everything the actions and the robot loop share during a tick. The scheduler hands a mutable
//! reference to the running action, so at most one component touches it at a time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use comms_if::{
    eqpt::{
        mech::{MechId, Mechanism},
        vision::PoseSource,
    },
    tc::{input::OperatorInput, RobotMode},
};
use log::{info, warn};

use crate::{
    heading_ctrl,
    loc::{Pose, PoseEstimator},
    loco_ctrl::LocoCtrl,
    teleop::InputShaper,
    tm_server::TmServer,
    traj_ctrl,
};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the robot has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    MakeSafeTc,
    ActuatorCommsLost,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Period of a cycle in seconds
    pub tick_period_s: f64,

    // Safe mode variables
    /// Determines if the robot is in safe mode.
    pub safe: bool,

    /// Gives the reason for the robot being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    /// The current operating mode.
    pub mode: RobotMode,

    // Operator input
    pub input: OperatorInput,
    pub prev_input: OperatorInput,

    // Drivetrain and localisation
    pub loco_ctrl: LocoCtrl,
    pub loc: PoseEstimator,
    pub pose_source: Option<Box<dyn PoseSource>>,

    // Sub-mechanisms
    pub mechs: BTreeMap<MechId, Box<dyn Mechanism>>,

    // Controller configuration shared by the drive actions
    pub shaper: InputShaper,
    pub heading_params: heading_ctrl::Params,
    pub traj_params: traj_ctrl::Params,

    // Trajectory following
    /// Name of the trajectory being followed, if any.
    pub active_path: Option<String>,

    /// Pose the follower is currently aiming for.
    pub traj_target: Option<Pose>,

    // Telemetry
    pub tm: TmServer,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create the store around an already built drivetrain and estimator.
    ///
    /// Starts disabled, out of safe mode, with no mechanisms or pose source fitted.
    pub fn new(
        loco_ctrl: LocoCtrl,
        loc: PoseEstimator,
        shaper: InputShaper,
        heading_params: heading_ctrl::Params,
        traj_params: traj_ctrl::Params,
        tm: TmServer,
    ) -> Self {
        Self {
            num_cycles: 0,
            tick_period_s: loco_ctrl.params().tick_period_s,
            safe: false,
            safe_cause: None,
            mode: RobotMode::Disabled,
            input: OperatorInput::default(),
            prev_input: OperatorInput::default(),
            loco_ctrl,
            loc,
            pose_source: None,
            mechs: BTreeMap::new(),
            shaper,
            heading_params,
            traj_params,
            active_path: None,
            traj_target: None,
            tm,
        }
    }

    /// Puts the robot into safe mode with the given cause.
    ///
    /// The drivetrain is stopped immediately. Cancelling running actions is the scheduler's job.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            self.loco_ctrl.stop();
            for (id, mech) in self.mechs.iter_mut() {
                if let Err(e) = mech.set_demand(0.0) {
                    warn!("Could not zero {:?} while making safe: {}", id, e);
                }
            }
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns true if safe mode is now disabled. To remove safe mode the provided cause must
    /// match the initial reason for safe mode being enabled.
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> bool {
        if !self.safe {
            return true;
        }

        match self.safe_cause {
            Some(root_cause) if root_cause != cause => {
                warn!(
                    "Make unsafe requested, root cause ({:?}) differs from request ({:?}), \
                    rejected",
                    root_cause, cause
                );
                false
            }
            _ => {
                self.safe = false;
                self.safe_cause = None;
                info!("Make unsafe requested, root cause match, safe mode disabled");
                true
            }
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Takes the new operator input and reads every drivetrain sensor once for the cycle.
    pub fn cycle_start(&mut self, input: OperatorInput) {
        self.prev_input = self.input;
        self.input = input;
        self.loco_ctrl.read_sensors();
    }

    /// Set a mechanism demand, logging failures.
    pub fn set_mech_demand(&mut self, id: MechId, demand: f64) {
        match self.mechs.get_mut(&id) {
            Some(m) => {
                if let Err(e) = m.set_demand(demand) {
                    warn!("Could not set {:?} demand: {}", id, e);
                }
            }
            None => warn!("No {:?} mechanism is fitted", id),
        }
    }

    /// True if the mechanism reports it has reached its demand. Faults read as not at target.
    pub fn mech_at_target(&mut self, id: MechId) -> bool {
        match self.mechs.get_mut(&id) {
            Some(m) => match m.at_target() {
                Ok(t) => t,
                Err(e) => {
                    warn!("Could not read {:?} state: {}", id, e);
                    false
                }
            },
            None => false,
        }
    }

    /// Current best estimate of the pose.
    pub fn pose(&self) -> Pose {
        self.loc.get_pose()
    }

    /// Reset the pose estimate to exactly `pose` using this cycle's sensor readings.
    pub fn reset_pose(&mut self, pose: Pose) {
        let gyro = self.loco_ctrl.raw_gyro_heading();
        let positions = self.loco_ctrl.module_positions();
        self.loc.reset(pose, gyro, positions);
    }
}

#[cfg(test)]
impl DataStore {
    /// A store wired to the simulated world with default parameters and every mechanism fitted.
    pub(crate) fn sim(world: &crate::sim_client::SimWorld) -> Self {
        use crate::{loc, loco_ctrl, teleop};

        let loco_params = loco_ctrl::Params::default();
        let loco_ctrl = match LocoCtrl::new(loco_params.clone(), world.modules(), world.gyro()) {
            Ok(l) => l,
            Err(e) => panic!("Could not build the drivetrain: {}", e),
        };
        let loc = PoseEstimator::new(
            loc::Params::default(),
            loco_ctrl.kinematics().clone(),
            loco_ctrl.raw_gyro_heading(),
            loco_ctrl.module_positions(),
        );
        let shaper = InputShaper::new(
            teleop::Params::default(),
            loco_params.max_trans_speed_ms,
            loco_params.max_ang_speed_rads,
        );

        let mut ds = Self::new(
            loco_ctrl,
            loc,
            shaper,
            heading_ctrl::Params::default(),
            traj_ctrl::Params::default(),
            TmServer::default(),
        );
        ds.mechs = world.mechanisms();
        ds
    }
}
