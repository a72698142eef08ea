//! Main drive executable entry point.
//!
//! # Architecture
//!
//! Startup builds every pilot that the available hardware allows, then hands over to the
//! [`ControlLoop`], which runs until the operator sends a stop through the remote control
//! server.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use comms_if::net::{zmq, NetParams};
use log::{info, warn};
use std::{cell::RefCell, path::PathBuf, rc::Rc, sync::Arc};
use structopt::StructOpt;

use drive_lib::{
    actuator::{ActuatorChannel, SysfsPwm},
    control_loop::{ControlLoop, LoopDevices},
    imu::IioImu,
    params::DriveExecParams,
    pilot::{
        AutonomousPilot, CategoricalModel, GamepadInput, PilotRegistry, RcInput, SharedInput,
    },
    recorder::{FileRecorder, FrameRecorder, NullRecorder},
    remote_server::RemoteServer,
    state::RoverState,
    status_led::{StatusLed, SysfsRgbLed},
    vision::{self, VisionKind},
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Thread started by ArduPilot, which holds the PWM outputs and sensors while it runs.
const APM_THREAD_NAME: &str = "ap-timer";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Rover drive executable")]
struct Opt {
    /// Path to the autonomous pilot's model, relative paths are from the software root.
    #[structopt(long, parse(from_os_str), default_value = "models/default.json")]
    model: PathBuf,

    /// Vision sensor to drive from.
    #[structopt(long, default_value = "camera")]
    vision: String,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    if util::host::thread_running("/proc", APM_THREAD_NAME)
        .wrap_err("Could not check for a running ArduPilot")?
    {
        return Err(eyre!(
            "ArduPilot is running and holds the hardware, stop it before starting drive_exec"
        ));
    }

    // ---- EARLY INITIALISATION ----

    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Rover Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: DriveExecParams =
        util::params::load("drive_exec.toml").wrap_err("Could not load drive_exec params")?;
    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- VISION ----

    // An unknown sensor is a configuration error, a known one that fails to open is not
    let vision_kind: VisionKind = opt.vision.parse().wrap_err("Invalid vision sensor")?;
    let vision = match vision::build_source(vision_kind, &params.camera) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Vision source unavailable: {}", e);
            None
        }
    };

    // ---- PILOTS ----

    let model_path = if opt.model.is_relative() {
        util::host::get_sw_root()
            .wrap_err("The ROVER_SW_ROOT environment variable is not set")?
            .join(&opt.model)
    } else {
        opt.model.clone()
    };
    let model = CategoricalModel::load(&model_path)
        .wrap_err_with(|| format!("Could not load the model from {:?}", model_path))?;
    info!("Model loaded from {:?}", model_path);

    let autonomous = Rc::new(AutonomousPilot::new(Box::new(model)));

    let gamepad = GamepadInput::new().map(|g| Rc::new(RefCell::new(g)) as SharedInput);
    let radio = RcInput::new(&params.rc).map(|r| Rc::new(RefCell::new(r)) as SharedInput);

    let registry = PilotRegistry::setup(autonomous, gamepad, radio, params.manual.deadband);

    let state = Arc::new(
        RoverState::new(registry.names()).wrap_err("Could not create the rover state")?,
    );

    // ---- DEVICES ----

    let throttle = ActuatorChannel::new(
        "throttle",
        Box::new(
            SysfsPwm::new(params.pwm.chip, params.pwm.throttle_channel)
                .wrap_err("Could not open the throttle PWM channel")?,
        ),
    );
    let steering = ActuatorChannel::new(
        "steering",
        Box::new(
            SysfsPwm::new(params.pwm.chip, params.pwm.steering_channel)
                .wrap_err("Could not open the steering PWM channel")?,
        ),
    );

    let recorder: Box<dyn FrameRecorder> = match FileRecorder::new(&session.records_root) {
        Ok(r) => Box::new(r),
        Err(e) => {
            warn!("Recording unavailable: {}", e);
            Box::new(NullRecorder)
        }
    };

    let led = match SysfsRgbLed::new(&params.led) {
        Ok(l) => Some(Box::new(l) as Box<dyn StatusLed>),
        Err(e) => {
            warn!("Status LED unavailable: {}", e);
            None
        }
    };

    let devices = LoopDevices {
        throttle,
        steering,
        imu: Box::new(IioImu::new(&params.imu)),
        vision,
        recorder,
        led,
    };

    // ---- MAIN LOOP ----

    let mut control_loop = ControlLoop::new(registry, state.clone(), devices, &params)
        .wrap_err("Could not create the drive loop")?;
    control_loop
        .init()
        .wrap_err("Failed to initialise the drive loop")?;

    let zmq_ctx = zmq::Context::new();
    let _remote_server = match RemoteServer::start(&zmq_ctx, &net_params, state) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Remote control unavailable: {}", e);
            None
        }
    };

    control_loop.run().wrap_err("Drive loop failed")?;

    info!("End of execution");

    Ok(())
}
