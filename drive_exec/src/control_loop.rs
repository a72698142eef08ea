//! # Drive loop
//!
//! The loop runs on a single thread with a fixed delay after each cycle's work. Each cycle:
//!
//! - Take the latest frame from the vision source, if there is one
//! - Ask the selected pilot for a command
//! - Record the frame and command if recording is enabled
//! - Read the IMU yaw rate
//! - Compute the actuator demands with drive control
//! - Write the demands to the throttle and steering channels
//!
//! While initialising, the status LED shows yellow for the PWM and IMU, white while vision
//! starts and goes dark once the loop is ready.
//!
//! Only failures during initialisation are fatal. Faults while running are logged and replaced
//! with safe defaults, so the loop keeps cycling until a stop is requested.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, info, trace, warn};
use serde::Serialize;
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use util::module::State;

use crate::{
    actuator::{ActuatorChannel, PwmError},
    drive_ctrl::{self, DriveCtrl, DriveCtrlError},
    imu::{ImuError, OrientationSensor},
    params::{CycleParams, DriveExecParams},
    pilot::{Command, PilotRegistry},
    recorder::FrameRecorder,
    state::RoverState,
    status_led::{Colour, StatusLed},
    vision::VisionSource,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Hardware used by the loop.
pub struct LoopDevices {
    pub throttle: ActuatorChannel,

    pub steering: ActuatorChannel,

    pub imu: Box<dyn OrientationSensor>,

    /// The vision source, `None` if it could not be built.
    pub vision: Option<Box<dyn VisionSource>>,

    pub recorder: Box<dyn FrameRecorder>,

    /// The status LED, `None` if the board has none.
    pub led: Option<Box<dyn StatusLed>>,
}

/// The drive loop.
pub struct ControlLoop {
    registry: PilotRegistry,

    state: Arc<RoverState>,

    devices: LoopDevices,

    drive_ctrl: DriveCtrl,

    drive_ctrl_params: drive_ctrl::Params,

    cycle_params: CycleParams,

    pwm_period_hz: f64,

    loop_state: LoopState,
}

/// What happened during one cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CycleReport {
    pub selected_pilot: usize,

    /// Command decided by the selected pilot.
    pub cmd: Command,

    /// Yaw rate used for the drift correction, zero if the IMU could not be read.
    ///
    /// Units: radians/second
    pub drift_rads: f64,

    pub output: drive_ctrl::OutputData,

    /// True if a frame was sent to the recorder.
    pub recorded: bool,

    /// Duration of the cycle's work.
    ///
    /// Units: seconds
    pub cycle_time_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Running,
    Terminated,
}

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("Could not set the carrier frequency of the {channel} channel: {source}")]
    ActuatorPeriodError {
        channel: &'static str,
        source: PwmError,
    },

    #[error("The IMU is not connected")]
    ImuNotConnected,

    #[error("Could not initialise the IMU: {0}")]
    ImuInitError(ImuError),

    #[error("Could not initialise drive control: {0}")]
    DriveCtrlInitError(DriveCtrlError),

    #[error("The loop is not running (state: {0:?})")]
    NotRunning(LoopState),

    #[error("No pilot at the selected index {0}")]
    PilotMissing(usize),

    #[error("The rover state lists pilots {state:?} but the registry holds {registry:?}")]
    PilotMismatch {
        state: Vec<String>,
        registry: Vec<String>,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ControlLoop {
    /// Create the loop. Nothing is touched until [`ControlLoop::init`].
    ///
    /// `state` must have been built from the registry's names, so that every index it accepts
    /// selects a pilot.
    pub fn new(
        registry: PilotRegistry,
        state: Arc<RoverState>,
        devices: LoopDevices,
        params: &DriveExecParams,
    ) -> Result<Self, LoopError> {
        let registry_names = registry.names();
        if state.pilot_names() != registry_names.as_slice() {
            return Err(LoopError::PilotMismatch {
                state: state.pilot_names().to_vec(),
                registry: registry_names,
            });
        }

        Ok(Self {
            registry,
            state,
            devices,
            drive_ctrl: DriveCtrl::default(),
            drive_ctrl_params: params.drive_ctrl.clone(),
            cycle_params: params.cycle.clone(),
            pwm_period_hz: params.pwm.period_hz,
            loop_state: LoopState::Initializing,
        })
    }

    pub fn state(&self) -> LoopState {
        self.loop_state
    }

    /// Prepare the hardware and move to the running state.
    ///
    /// Any error is fatal and leaves the loop terminated with the actuators untouched.
    pub fn init(&mut self) -> Result<(), LoopError> {
        if self.loop_state != LoopState::Initializing {
            return Err(LoopError::NotRunning(self.loop_state));
        }

        let result = self.init_devices();

        self.loop_state = match result {
            Ok(()) => LoopState::Running,
            Err(_) => LoopState::Terminated,
        };

        result
    }

    fn init_devices(&mut self) -> Result<(), LoopError> {
        self.show_status(Colour::Yellow);

        self.drive_ctrl
            .init(self.drive_ctrl_params.clone())
            .map_err(LoopError::DriveCtrlInitError)?;

        for channel in [&mut self.devices.throttle, &mut self.devices.steering].iter_mut() {
            channel.set_period_hz(self.pwm_period_hz).map_err(|e| {
                LoopError::ActuatorPeriodError {
                    channel: channel.name(),
                    source: e,
                }
            })?;
        }
        debug!("PWM carrier set to {} Hz", self.pwm_period_hz);

        if !self.devices.imu.connected() {
            error!("IMU connection failed");
            return Err(LoopError::ImuNotConnected);
        }
        self.devices
            .imu
            .initialise()
            .map_err(LoopError::ImuInitError)?;
        info!("IMU initialised");

        self.show_status(Colour::White);

        match self.devices.vision {
            Some(ref mut v) => match v.start() {
                Ok(()) => info!("Vision source started"),
                Err(e) => warn!("Could not start the vision source, continuing without frames: {}", e),
            },
            None => warn!("No vision source, continuing without frames"),
        }

        self.show_status(Colour::Black);

        Ok(())
    }

    fn show_status(&mut self, colour: Colour) {
        if let Some(ref mut led) = self.devices.led {
            if let Err(e) = led.set_colour(colour) {
                warn!("Could not set the status LED to {:?}: {}", colour, e);
            }
        }
    }

    /// Execute a single cycle.
    pub fn step(&mut self) -> Result<CycleReport, LoopError> {
        if self.loop_state != LoopState::Running {
            return Err(LoopError::NotRunning(self.loop_state));
        }

        let cycle_start = Instant::now();

        // ---- DECIDE ----

        let frame = self.devices.vision.as_ref().and_then(|v| v.latest_frame());

        let selected_pilot = self.state.selected_pilot();
        let cmd = self
            .registry
            .get(selected_pilot)
            .ok_or(LoopError::PilotMissing(selected_pilot))?
            .decide(frame.as_deref());

        // ---- RECORD ----

        let mut recorded = false;
        if self.state.recording() {
            match frame {
                Some(ref f) => {
                    self.devices
                        .recorder
                        .record_frame(f, cmd.steering_angle, cmd.throttle);
                    recorded = true;
                }
                None => trace!("No frame to record"),
            }
        }

        // ---- DRIFT ----

        let drift_rads = match self.devices.imu.read_motion() {
            Ok(sample) => sample.yaw_rate_rads(),
            Err(e) => {
                warn!("Could not read the IMU, assuming no drift: {}", e);
                0.0
            }
        };

        // ---- DRIVE CONTROL ----

        let output = match self.drive_ctrl.proc(&drive_ctrl::InputData { cmd, drift_rads }) {
            Ok((output, report)) => {
                if report.throttle_limited || report.steering_limited {
                    trace!("Drive demands limited: {:?}", report);
                }
                output
            }
            Err(e) => {
                warn!("Drive control failed, holding neutral: {}", e);
                drive_ctrl::OutputData::default()
            }
        };

        // ---- ACTUATE ----

        let mut demands = [
            (&mut self.devices.throttle, output.throttle),
            (&mut self.devices.steering, output.steering),
        ];
        for (channel, value) in demands.iter_mut() {
            if let Err(e) = channel.set_normalised(*value) {
                warn!("Could not write the {} demand: {}", channel.name(), e);
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_time_s = cycle_start.elapsed().as_secs_f64();
        self.state.record_cycle(cycle_time_s);

        if cycle_time_s > self.cycle_params.cycle_warn_s {
            warn!(
                "Cycle took {:.06} s, longer than {:.06} s",
                cycle_time_s, self.cycle_params.cycle_warn_s
            );
        }

        Ok(CycleReport {
            selected_pilot,
            cmd,
            drift_rads,
            output,
            recorded,
            cycle_time_s,
        })
    }

    /// Cycle until a stop is requested, then put the actuators in neutral.
    ///
    /// The actuators are also neutralised if a cycle fails.
    pub fn run(&mut self) -> Result<(), LoopError> {
        if self.loop_state != LoopState::Running {
            return Err(LoopError::NotRunning(self.loop_state));
        }

        info!("Drive loop running");

        let cycle_delay = Duration::from_secs_f64(self.cycle_params.cycle_delay_s.max(0.0));

        while !self.state.stop_requested() {
            if let Err(e) = self.step() {
                error!("Drive loop cycle failed: {}", e);
                self.shutdown();
                return Err(e);
            }
            thread::sleep(cycle_delay);
        }

        self.shutdown();

        Ok(())
    }

    /// Neutralise the actuators, stop the vision source and terminate the loop.
    pub fn shutdown(&mut self) {
        for channel in [&mut self.devices.throttle, &mut self.devices.steering].iter_mut() {
            if let Err(e) = channel.set_normalised(0.0) {
                warn!("Could not neutralise the {} channel: {}", channel.name(), e);
            }
        }

        if let Some(ref mut v) = self.devices.vision {
            v.stop();
        }

        self.loop_state = LoopState::Terminated;

        info!(
            "Drive loop terminated after {} cycles",
            self.state.num_cycles()
        );
    }
}
