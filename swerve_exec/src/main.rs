//! Swerve drive executable entry point.
//!
//! Runs the control core at a fixed tick against the simulated drivetrain.
//!
//! # Architecture
//!
//! - Initialise the session, logging and parameters
//! - Build the simulated equipment and the robot around it
//! - Main loop:
//!     - Telecommand processing, from an operator script or a fixed autonomous run
//!     - Robot tick (sensing, estimation, bindings, scheduling, telemetry)
//!     - Simulation step
//!     - Cycle management

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use comms_if::tc::{RobotMode, Tc};
use swerve_lib::{
    loc::Pose,
    robot::{Robot, RobotParams},
    sim_client::SimWorld,
    tm_server::{ArchiveSink, TmServer},
};
use util::{
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Ticks between simulated vision observations.
const VISION_PERIOD_TICKS: u64 = 25;

/// Confidence reported with each simulated vision observation.
const VISION_CONFIDENCE: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Swerve drive control core running against simulated hardware.
#[derive(Debug, StructOpt)]
#[structopt(name = "swerve_exec")]
struct Opts {
    /// Operator script to run. Without a script the selected routine is run in autonomous.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Select this autonomous routine before starting.
    #[structopt(short, long)]
    routine: Option<String>,

    /// Length of the autonomous run when no script is given, in seconds.
    #[structopt(short, long, default_value = "15.0")]
    duration_s: f64,

    /// Minimum log level, one of info, debug or trace.
    #[structopt(short, long, default_value = "debug")]
    log_level: LevelFilter,

    /// Run as fast as possible rather than in real time.
    #[structopt(long)]
    fast: bool,
}

/// Various sources for the telecommands incoming to the exec.
enum TcSource {
    Script(ScriptInterpreter),
    Autonomous { end_time_s: f64 },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session =
        Session::new("swerve_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(opts.log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Swerve Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let params = RobotParams::load().wrap_err("Could not load the parameters")?;
    let period_s = params.loco_ctrl.tick_period_s;
    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = match opts.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;
            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            TcSource::Script(si)
        }
        None => {
            info!("No script provided, running autonomous for {:.02} s\n", opts.duration_s);
            TcSource::Autonomous {
                end_time_s: opts.duration_s,
            }
        }
    };

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let world = SimWorld::new(params.loco_ctrl.module_pos_m_rb, period_s);
    let [x, y, h] = params.loc.initial_pose;
    world.set_pose(Pose::new(x, y, h));

    let mut eqpt = world.equipment();
    eqpt.pose_source = Some(world.vision(VISION_PERIOD_TICKS, VISION_CONFIDENCE));

    let tm = TmServer::new(Box::new(
        ArchiveSink::new(&session).wrap_err("Failed to initialise the telemetry archive")?,
    ));

    let mut robot = Robot::new(params, eqpt, tm).wrap_err("Failed to initialise the robot")?;

    if let Some(ref name) = opts.routine {
        robot.handle_tc(&Tc::SelectRoutine(name.clone()));
    }

    if let TcSource::Autonomous { .. } = tc_source {
        robot.handle_tc(&Tc::SetMode(RobotMode::Autonomous));
    }

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    loop {
        let cycle_start_instant = Instant::now();
        let sim_time_s = robot.ds.num_cycles as f64 * period_s;

        // ---- TELECOMMAND PROCESSING ----

        match tc_source {
            TcSource::Script(ref mut si) => match si.get_pending_tcs(sim_time_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tcs) => {
                    for tc in tcs.iter() {
                        debug!("Executing TC {:?}", tc);
                        robot.handle_tc(tc);
                    }
                }
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    break;
                }
            },
            TcSource::Autonomous { end_time_s } => {
                if sim_time_s >= end_time_s {
                    info!("Autonomous run complete");
                    break;
                }
            }
        }

        // ---- CONTROL PROCESSING ----

        robot.step();
        world.step();

        // ---- CYCLE MANAGEMENT ----

        if opts.fast {
            continue;
        }

        let cycle_dur = Instant::now() - cycle_start_instant;
        match Duration::from_secs_f64(period_s).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - period_s
            ),
        }
    }

    // ---- SHUTDOWN ----

    robot.set_mode(RobotMode::Disabled);

    info!(
        "Final pose estimate {:?}, true pose {:?}",
        robot.ds.pose().to_array(),
        world.pose().to_array()
    );
    info!("End of execution");

    Ok(())
}
