//! Implementations for the LocoCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::{
    swerve::{Corner, Gyro, ModulePosition, ModuleState, SwerveModule, NUM_MODULES},
    EqptError,
};
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use util::maths::wrap_pi;

// Internal
use super::{desaturate, AccelLimiter, ChassisVelocity, LocoCtrlError, Params, SwerveKinematics};
use crate::{loc::Pose, tm_server::TmServer};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Locomotion control module state
pub struct LocoCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,

    kinematics: SwerveKinematics,
    limiter: AccelLimiter,

    modules: [Box<dyn SwerveModule>; NUM_MODULES],
    gyro: Box<dyn Gyro>,

    /// Raw gyro heading that counts as zero.
    gyro_offset_rad: f64,

    // Sensor values from the last call to `read_sensors`
    raw_heading_rad: f64,
    yaw_rate_rads: f64,
    positions: [ModulePosition; NUM_MODULES],
    measured: [ModuleState; NUM_MODULES],

    targets: [ModuleState; NUM_MODULES],
    commanded: ChassisVelocity,

    x_config: bool,
    brake_on: bool,
}

/// Status report for LocoCtrl processing, cleared at the start of every tick.
#[derive(Clone, Copy, Default, Serialize, Debug, PartialEq)]
pub struct StatusReport {
    /// The gyro could not be read, the last good heading is in use.
    pub gyro_fault: bool,

    /// A module's position could not be read, its last good position is in use.
    pub position_fault: [bool; NUM_MODULES],

    /// A module's measured state could not be read, its last good state is in use.
    pub state_fault: [bool; NUM_MODULES],

    /// A demand could not be sent to a module.
    pub actuator_fault: [bool; NUM_MODULES],

    /// Wheel speeds were scaled down to respect the maximum wheel speed.
    pub desaturated: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocoCtrl {
    /// Create a new LocoCtrl owning the given hardware.
    ///
    /// Modules must be given in [`Corner::ALL`] order.
    pub fn new(
        params: Params,
        modules: [Box<dyn SwerveModule>; NUM_MODULES],
        gyro: Box<dyn Gyro>,
    ) -> Result<Self, LocoCtrlError> {
        if params.tick_period_s <= 0.0 {
            return Err(LocoCtrlError::InvalidTickPeriod(params.tick_period_s));
        }

        let kinematics = SwerveKinematics::new(params.module_pos_m_rb)?;
        let limiter = AccelLimiter::new(
            params.max_trans_accel_mss,
            params.max_ang_accel_radss,
            params.tick_period_s,
        );

        let mut loco_ctrl = Self {
            params,
            report: StatusReport::default(),
            kinematics,
            limiter,
            modules,
            gyro,
            gyro_offset_rad: 0.0,
            raw_heading_rad: 0.0,
            yaw_rate_rads: 0.0,
            positions: [ModulePosition::default(); NUM_MODULES],
            measured: [ModuleState::default(); NUM_MODULES],
            targets: [ModuleState::default(); NUM_MODULES],
            commanded: ChassisVelocity::zero(),
            x_config: false,
            brake_on: false,
        };

        // Prime the cached readings so the first tick differences against real values
        loco_ctrl.read_sensors();

        Ok(loco_ctrl)
    }

    /// Read every sensor once for this tick.
    ///
    /// Readings that fail keep their last good value and raise the matching flag in the status
    /// report.
    pub fn read_sensors(&mut self) {
        self.report = StatusReport::default();

        match self.gyro.heading_rad() {
            Ok(h) => self.raw_heading_rad = h,
            Err(e) => {
                warn!("Gyro heading unavailable: {}", e);
                self.report.gyro_fault = true;
            }
        }
        match self.gyro.yaw_rate_rads() {
            Ok(r) => self.yaw_rate_rads = r,
            Err(e) => {
                warn!("Gyro yaw rate unavailable: {}", e);
                self.report.gyro_fault = true;
            }
        }

        for corner in Corner::ALL.iter() {
            let i = corner.index();

            match self.modules[i].position() {
                Ok(p) => self.positions[i] = p,
                Err(e) => {
                    warn!("{} module position unavailable: {}", corner.name(), e);
                    self.report.position_fault[i] = true;
                }
            }
            match self.modules[i].measured_state() {
                Ok(s) => self.measured[i] = s,
                Err(e) => {
                    warn!("{} module state unavailable: {}", corner.name(), e);
                    self.report.state_fault[i] = true;
                }
            }
        }
    }

    /// Drive the chassis at the given chassis-frame velocity.
    pub fn drive(&mut self, vel: ChassisVelocity, closed_loop: bool) {
        let limited = self.limiter.calculate(&vel);
        let discrete = limited.discretize(self.params.tick_period_s);

        let mut targets = self.kinematics.to_module_states(&discrete);

        // Hold the wheels where they are when stopping
        if discrete.is_zero() {
            for (target, last) in targets.iter_mut().zip(self.targets.iter()) {
                target.angle_rad = last.angle_rad;
            }
        }

        self.report.desaturated = desaturate(&mut targets, self.params.max_wheel_speed_ms);
        if self.report.desaturated {
            debug!("Module speeds desaturated");
        }

        trace!("LocoCtrl drive {:?} -> {:?}", vel, targets);

        self.commanded = discrete;
        self.x_config = false;
        self.apply_targets(targets, closed_loop);
    }

    /// Bring the chassis to a stop immediately, bypassing the acceleration limiter.
    pub fn stop(&mut self) {
        self.limiter.reset(ChassisVelocity::zero());

        let mut targets = self.targets;
        for t in targets.iter_mut() {
            t.speed_ms = 0.0;
        }

        self.commanded = ChassisVelocity::zero();
        self.x_config = false;
        self.apply_targets(targets, false);
    }

    /// Convert a field-frame velocity into the chassis frame using the offset gyro heading.
    pub fn field_to_robot(&self, vel: ChassisVelocity) -> ChassisVelocity {
        ChassisVelocity::from_field_relative(vel, self.gyro_heading())
    }

    /// Point every wheel towards the chassis centre so the platform resists being pushed.
    pub fn set_x_config(&mut self) {
        if !self.x_config {
            info!("Drivetrain entering X configuration");
        }

        self.limiter.reset(ChassisVelocity::zero());
        self.commanded = ChassisVelocity::zero();

        let layout = self.params.module_pos_m_rb;
        for (i, pos) in layout.iter().enumerate() {
            self.targets[i] = ModuleState {
                angle_rad: pos[1].atan2(pos[0]),
                speed_ms: 0.0,
            };

            if let Err(e) = self.modules[i].set_x_configuration() {
                self.actuator_error(i, e);
            }
        }

        self.x_config = true;
    }

    pub fn set_brake_mode(&mut self, on: bool) {
        for i in 0..NUM_MODULES {
            if let Err(e) = self.modules[i].set_brake_mode(on) {
                self.actuator_error(i, e);
            }
        }

        if on != self.brake_on {
            debug!("Drive brake mode {}", if on { "on" } else { "off" });
        }
        self.brake_on = on;
    }

    /// Make the current gyro heading read as zero.
    pub fn zero_gyro(&mut self) {
        self.gyro_offset_rad = self.raw_heading_rad;
        info!("Gyro zeroed, offset {:.3} rad", self.gyro_offset_rad);
    }

    /// Make the gyro heading read as the heading of `pose`.
    pub fn match_gyro_to_pose(&mut self, pose: &Pose) {
        self.gyro_offset_rad = self.raw_heading_rad - pose.heading_rad;
        info!(
            "Gyro matched to pose heading {:.3} rad, offset {:.3} rad",
            pose.heading_rad, self.gyro_offset_rad
        );
    }

    /// Heading of the chassis with the software zero applied.
    pub fn gyro_heading(&self) -> f64 {
        wrap_pi(self.raw_heading_rad - self.gyro_offset_rad)
    }

    /// Heading as reported by the gyro itself.
    pub fn raw_gyro_heading(&self) -> f64 {
        self.raw_heading_rad
    }

    pub fn gyro_yaw_rate(&self) -> f64 {
        self.yaw_rate_rads
    }

    pub fn module_positions(&self) -> [ModulePosition; NUM_MODULES] {
        self.positions
    }

    pub fn measured_states(&self) -> [ModuleState; NUM_MODULES] {
        self.measured
    }

    pub fn target_states(&self) -> [ModuleState; NUM_MODULES] {
        self.targets
    }

    /// Chassis velocity implied by the measured module states.
    pub fn measured_chassis_velocity(&self) -> ChassisVelocity {
        self.kinematics.to_chassis_velocity(&self.measured)
    }

    /// The velocity last sent to the modules, after limiting and discretisation.
    pub fn commanded_velocity(&self) -> ChassisVelocity {
        self.commanded
    }

    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    pub fn is_x_config(&self) -> bool {
        self.x_config
    }

    pub fn is_brake_on(&self) -> bool {
        self.brake_on
    }

    /// True if any demand failed to reach its module this tick.
    pub fn has_actuator_fault(&self) -> bool {
        self.report.actuator_fault.iter().any(|f| *f)
    }

    /// Publish the drivetrain telemetry for this tick.
    pub fn write_tm(&self, tm: &mut TmServer) {
        tm.send_scalar("loco_ctrl/raw_gyro_heading_rad", self.raw_heading_rad);
        tm.send_scalar("loco_ctrl/gyro_heading_rad", self.gyro_heading());
        tm.send_array("loco_ctrl/commanded_velocity", &self.commanded.to_array());
        tm.send_array(
            "loco_ctrl/measured_velocity",
            &self.measured_chassis_velocity().to_array(),
        );

        for corner in Corner::ALL.iter() {
            let t = &self.targets[corner.index()];
            tm.send_array(
                &format!("loco_ctrl/target/{}", corner.name()),
                &[t.angle_rad, t.speed_ms],
            );
        }

        tm.send_flag("loco_ctrl/gyro_fault", self.report.gyro_fault);
        tm.send_flag(
            "loco_ctrl/sensor_fault",
            self.report.position_fault.iter().chain(self.report.state_fault.iter()).any(|f| *f),
        );
        tm.send_flag("loco_ctrl/actuator_fault", self.has_actuator_fault());
        tm.send_flag("loco_ctrl/desaturated", self.report.desaturated);
        tm.send_flag("loco_ctrl/x_config", self.x_config);
    }

    fn apply_targets(&mut self, targets: [ModuleState; NUM_MODULES], closed_loop: bool) {
        self.targets = targets;

        for i in 0..NUM_MODULES {
            if let Err(e) = self.modules[i].set_target_state(targets[i], closed_loop) {
                self.actuator_error(i, e);
            }
        }
    }

    fn actuator_error(&mut self, index: usize, e: EqptError) {
        error!("{} module demand failed: {}", Corner::ALL[index].name(), e);
        self.report.actuator_fault[index] = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim_client::SimWorld;
    use approx::assert_abs_diff_eq;

    fn loco(world: &SimWorld) -> LocoCtrl {
        LocoCtrl::new(Params::default(), world.modules(), world.gyro()).unwrap()
    }

    #[test]
    fn test_stop_holds_angle() {
        let world = SimWorld::new(Params::default().module_pos_m_rb, 0.02);
        let mut lc = loco(&world);

        // Drive sideways long enough to pass the limiter
        for _ in 0..10 {
            lc.drive(ChassisVelocity::new(0.0, 0.1, 0.0), true);
        }
        let angle = lc.target_states()[0].angle_rad;
        assert_abs_diff_eq!(angle, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);

        // Decelerate to exactly zero, the wheels keep pointing sideways
        for _ in 0..10 {
            lc.drive(ChassisVelocity::zero(), true);
        }
        for t in lc.target_states().iter() {
            assert_eq!(t.speed_ms, 0.0);
            assert_abs_diff_eq!(t.angle_rad, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_gyro_offset() {
        let world = SimWorld::new(Params::default().module_pos_m_rb, 0.02);
        world.set_heading(1.0);
        let mut lc = loco(&world);

        lc.read_sensors();
        assert_abs_diff_eq!(lc.gyro_heading(), 1.0);

        lc.zero_gyro();
        assert_abs_diff_eq!(lc.gyro_heading(), 0.0);

        lc.match_gyro_to_pose(&Pose::new(0.0, 0.0, -0.5));
        assert_abs_diff_eq!(lc.gyro_heading(), -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(lc.raw_gyro_heading(), 1.0);
    }

    #[test]
    fn test_sensor_fault_keeps_last_value() {
        let world = SimWorld::new(Params::default().module_pos_m_rb, 0.02);
        world.set_heading(0.3);
        let mut lc = loco(&world);

        world.set_gyro_fault(true);
        world.set_heading(2.0);
        lc.read_sensors();

        assert!(lc.report().gyro_fault);
        assert_abs_diff_eq!(lc.gyro_heading(), 0.3);
    }

    #[test]
    fn test_actuator_fault_reported() {
        let world = SimWorld::new(Params::default().module_pos_m_rb, 0.02);
        let mut lc = loco(&world);

        world.set_comms_lost(true);
        lc.read_sensors();
        lc.drive(ChassisVelocity::new(1.0, 0.0, 0.0), false);

        assert!(lc.has_actuator_fault());
    }

    #[test]
    fn test_x_config() {
        let world = SimWorld::new(Params::default().module_pos_m_rb, 0.02);
        let mut lc = loco(&world);

        lc.set_x_config();
        assert!(lc.is_x_config());
        assert_abs_diff_eq!(lc.target_states()[0].angle_rad, std::f64::consts::FRAC_PI_4);
        assert_abs_diff_eq!(lc.target_states()[3].angle_rad, -3.0 * std::f64::consts::FRAC_PI_4);

        lc.drive(ChassisVelocity::zero(), true);
        assert!(!lc.is_x_config());
    }
}
