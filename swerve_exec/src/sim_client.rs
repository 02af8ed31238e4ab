//! # Simulation Client
//!
//! Ideal simulated equipment for running the control core without hardware. Every simulated
//! device is a handle onto one shared [`SimWorld`], which is advanced by one tick with
//! [`SimWorld::step`] after the control core has run.
//!
//! - Modules reach their demanded state instantly and integrate distance at the demanded speed.
//! - The gyro reads the true heading plus a bias.
//! - Mechanisms slew towards their demand at a fixed rate.
//! - The vision source reports the true pose every few ticks.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use comms_if::eqpt::{
    mech::{MechId, Mechanism},
    swerve::{Gyro, ModulePosition, ModuleState, SwerveModule, NUM_MODULES},
    vision::{PoseObservation, PoseSource},
    EqptError,
};
use log::trace;
use nalgebra::Vector2;

use crate::{
    loc::{Pose, Twist},
    robot::Equipment,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Rate at which simulated mechanisms approach their demand, in demand units per second.
const MECH_SLEW_RATE: f64 = 200.0;

/// Distance from the demand within which a simulated mechanism counts as at target.
const MECH_TOLERANCE: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle onto the shared simulated world. Clones refer to the same world.
#[derive(Clone)]
pub struct SimWorld {
    state: Rc<RefCell<WorldState>>,
}

/// A simulated swerve module.
pub struct SimModule {
    world: SimWorld,
    index: usize,
}

/// A simulated gyro.
pub struct SimGyro {
    world: SimWorld,
}

/// A simulated mechanism.
pub struct SimMechanism {
    world: SimWorld,
    id: MechId,
}

/// A simulated absolute pose source.
pub struct SimVision {
    world: SimWorld,
    period_ticks: u64,
    confidence: f64,
    last_tick: Option<u64>,
}

struct WorldState {
    tick_period_s: f64,
    num_ticks: u64,
    layout_m_rb: [[f64; 2]; NUM_MODULES],
    pose: Pose,
    gyro_bias_rad: f64,
    yaw_rate_rads: f64,
    modules: [ModuleState; NUM_MODULES],
    distances_m: [f64; NUM_MODULES],
    brake_on: bool,
    mechs: BTreeMap<MechId, MechState>,
    gyro_fault: bool,
    comms_lost: bool,
}

#[derive(Default, Clone, Copy)]
struct MechState {
    demand: f64,
    value: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimWorld {
    /// Create a world with the platform at the origin, modules at the given chassis positions.
    pub fn new(layout_m_rb: [[f64; 2]; NUM_MODULES], tick_period_s: f64) -> Self {
        let mechs = MechId::ALL
            .iter()
            .map(|id| (*id, MechState::default()))
            .collect();

        Self {
            state: Rc::new(RefCell::new(WorldState {
                tick_period_s,
                num_ticks: 0,
                layout_m_rb,
                pose: Pose::default(),
                gyro_bias_rad: 0.0,
                yaw_rate_rads: 0.0,
                modules: [ModuleState::default(); NUM_MODULES],
                distances_m: [0.0; NUM_MODULES],
                brake_on: false,
                mechs,
                gyro_fault: false,
                comms_lost: false,
            })),
        }
    }

    /// Simulated modules in front left, front right, back left, back right order.
    pub fn modules(&self) -> [Box<dyn SwerveModule>; NUM_MODULES] {
        [
            Box::new(SimModule { world: self.clone(), index: 0 }),
            Box::new(SimModule { world: self.clone(), index: 1 }),
            Box::new(SimModule { world: self.clone(), index: 2 }),
            Box::new(SimModule { world: self.clone(), index: 3 }),
        ]
    }

    pub fn gyro(&self) -> Box<dyn Gyro> {
        Box::new(SimGyro { world: self.clone() })
    }

    pub fn mechanism(&self, id: MechId) -> Box<dyn Mechanism> {
        Box::new(SimMechanism { world: self.clone(), id })
    }

    /// All simulated mechanisms keyed by ID.
    pub fn mechanisms(&self) -> BTreeMap<MechId, Box<dyn Mechanism>> {
        MechId::ALL.iter().map(|id| (*id, self.mechanism(*id))).collect()
    }

    /// Every simulated device, with no pose source fitted.
    pub fn equipment(&self) -> Equipment {
        Equipment {
            modules: self.modules(),
            gyro: self.gyro(),
            mechs: self.mechanisms(),
            pose_source: None,
        }
    }

    /// A pose source reporting the true pose every `period_ticks` ticks.
    pub fn vision(&self, period_ticks: u64, confidence: f64) -> Box<dyn PoseSource> {
        Box::new(SimVision {
            world: self.clone(),
            period_ticks: period_ticks.max(1),
            confidence,
            last_tick: None,
        })
    }

    /// Advance the world by one tick using the current module states.
    pub fn step(&self) {
        let mut s = self.state.borrow_mut();
        let dt = s.tick_period_s;

        let mut vx = 0.0;
        let mut vy = 0.0;
        let mut moment = 0.0;
        let mut inertia = 0.0;

        for i in 0..NUM_MODULES {
            let m = s.modules[i];
            let [x, y] = s.layout_m_rb[i];
            let mvx = m.speed_ms * m.angle_rad.cos();
            let mvy = m.speed_ms * m.angle_rad.sin();

            vx += mvx / NUM_MODULES as f64;
            vy += mvy / NUM_MODULES as f64;
            moment += x * mvy - y * mvx;
            inertia += x * x + y * y;

            s.distances_m[i] += m.speed_ms * dt;
        }

        let omega = if inertia > 0.0 { moment / inertia } else { 0.0 };

        s.yaw_rate_rads = omega;
        s.pose = s.pose.exp(&Twist {
            dx_m: vx * dt,
            dy_m: vy * dt,
            dtheta_rad: omega * dt,
        });

        for mech in s.mechs.values_mut() {
            let step = MECH_SLEW_RATE * dt;
            let err = mech.demand - mech.value;
            mech.value += err.max(-step).min(step);
        }

        s.num_ticks += 1;

        trace!("SimWorld tick {}: pose {:?}", s.num_ticks, s.pose);
    }

    /// True pose of the platform.
    pub fn pose(&self) -> Pose {
        self.state.borrow().pose
    }

    /// Place the platform at a pose without moving the wheels.
    pub fn set_pose(&self, pose: Pose) {
        self.state.borrow_mut().pose = pose;
    }

    /// Rotate the platform to the given true heading.
    pub fn set_heading(&self, heading_rad: f64) {
        let mut s = self.state.borrow_mut();
        s.pose = Pose {
            position_m: s.pose.position_m,
            heading_rad,
        };
    }

    /// Set the difference between the gyro reading and the true heading.
    pub fn set_gyro_bias(&self, bias_rad: f64) {
        self.state.borrow_mut().gyro_bias_rad = bias_rad;
    }

    /// Move the platform by an offset in the field frame, as if it were pushed.
    pub fn push(&self, offset_m: Vector2<f64>) {
        self.state.borrow_mut().pose.position_m += offset_m;
    }

    pub fn set_gyro_fault(&self, fault: bool) {
        self.state.borrow_mut().gyro_fault = fault;
    }

    pub fn set_comms_lost(&self, lost: bool) {
        self.state.borrow_mut().comms_lost = lost;
    }

    pub fn module_states(&self) -> [ModuleState; NUM_MODULES] {
        self.state.borrow().modules
    }

    pub fn is_brake_on(&self) -> bool {
        self.state.borrow().brake_on
    }

    pub fn mech_demand(&self, id: MechId) -> f64 {
        self.state.borrow().mechs.get(&id).map(|m| m.demand).unwrap_or(0.0)
    }

    pub fn num_ticks(&self) -> u64 {
        self.state.borrow().num_ticks
    }

    fn check_comms(&self) -> Result<(), EqptError> {
        match self.state.borrow().comms_lost {
            true => Err(EqptError::CommsLost("simulated bus is down".into())),
            false => Ok(()),
        }
    }
}

impl SwerveModule for SimModule {
    fn measured_state(&mut self) -> Result<ModuleState, EqptError> {
        self.world.check_comms()?;
        Ok(self.world.state.borrow().modules[self.index])
    }

    fn position(&mut self) -> Result<ModulePosition, EqptError> {
        self.world.check_comms()?;
        let s = self.world.state.borrow();
        Ok(ModulePosition {
            angle_rad: s.modules[self.index].angle_rad,
            distance_m: s.distances_m[self.index],
        })
    }

    fn set_target_state(&mut self, state: ModuleState, _closed_loop: bool) -> Result<(), EqptError> {
        self.world.check_comms()?;
        self.world.state.borrow_mut().modules[self.index] = state;
        Ok(())
    }

    fn set_brake_mode(&mut self, on: bool) -> Result<(), EqptError> {
        self.world.check_comms()?;
        self.world.state.borrow_mut().brake_on = on;
        Ok(())
    }

    fn set_x_configuration(&mut self) -> Result<(), EqptError> {
        self.world.check_comms()?;
        let mut s = self.world.state.borrow_mut();
        let [x, y] = s.layout_m_rb[self.index];
        s.modules[self.index] = ModuleState {
            angle_rad: y.atan2(x),
            speed_ms: 0.0,
        };
        Ok(())
    }
}

impl Gyro for SimGyro {
    fn heading_rad(&mut self) -> Result<f64, EqptError> {
        let s = self.world.state.borrow();
        match s.gyro_fault {
            true => Err(EqptError::InvalidReading("simulated gyro fault".into())),
            false => Ok(s.pose.heading_rad + s.gyro_bias_rad),
        }
    }

    fn yaw_rate_rads(&mut self) -> Result<f64, EqptError> {
        let s = self.world.state.borrow();
        match s.gyro_fault {
            true => Err(EqptError::InvalidReading("simulated gyro fault".into())),
            false => Ok(s.yaw_rate_rads),
        }
    }
}

impl Mechanism for SimMechanism {
    fn set_demand(&mut self, demand: f64) -> Result<(), EqptError> {
        self.world.check_comms()?;
        if let Some(m) = self.world.state.borrow_mut().mechs.get_mut(&self.id) {
            m.demand = demand;
        }
        Ok(())
    }

    fn at_target(&mut self) -> Result<bool, EqptError> {
        self.world.check_comms()?;
        Ok(self
            .world
            .state
            .borrow()
            .mechs
            .get(&self.id)
            .map(|m| (m.demand - m.value).abs() < MECH_TOLERANCE)
            .unwrap_or(false))
    }
}

impl PoseSource for SimVision {
    fn latest(&mut self) -> Option<PoseObservation> {
        let (tick, pose) = {
            let s = self.world.state.borrow();
            (s.num_ticks, s.pose)
        };

        let due = match self.last_tick {
            Some(t) => tick >= t + self.period_ticks,
            None => true,
        };
        if !due {
            return None;
        }

        self.last_tick = Some(tick);
        Some(PoseObservation {
            position_m: [pose.x(), pose.y()],
            heading_rad: pose.heading_rad,
            confidence: self.confidence,
        })
    }
}
