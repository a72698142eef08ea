//! Implementations for the DriveCtrl state structure

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use serde::Serialize;
use util::{maths::clamp, module::State};

use super::{DriveCtrlError, Params};
use crate::pilot::Command;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Drive control module state
#[derive(Default)]
pub struct DriveCtrl {
    params: Params,

    report: StatusReport,
}

/// Input data to drive control.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// The command decided by the selected pilot this cycle.
    pub cmd: Command,

    /// Yaw rate of the rover.
    ///
    /// Units: radians/second
    pub drift_rads: f64,
}

/// Normalised demands for the actuators, both in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutputData {
    pub throttle: f64,

    pub steering: f64,
}

/// Status report for DriveCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// The throttle demand was outside `[-1, 1]` and has been limited.
    pub throttle_limited: bool,

    /// The steering demand was outside `[-1, 1]` and has been limited.
    pub steering_limited: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveCtrl {
    /// Convert a steering angle into a normalised yaw demand.
    pub fn angle_to_yaw(&self, angle: f64) -> f64 {
        angle / self.params.max_steering_angle
    }
}

impl State for DriveCtrl {
    type InitData = Params;
    type InitError = DriveCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    /// Initialise the DriveCtrl module with its parameters.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        if !init_data.max_steering_angle.is_finite() || init_data.max_steering_angle <= 0.0 {
            return Err(DriveCtrlError::InvalidMaxSteeringAngle(
                init_data.max_steering_angle,
            ));
        }
        if !init_data.drift_gain.is_finite() {
            return Err(DriveCtrlError::InvalidDriftGain(init_data.drift_gain));
        }

        self.params = init_data;

        Ok(())
    }

    /// Compute the actuator demands for this cycle.
    ///
    /// The actuators are mounted so that positive demands reverse and steer left, hence both
    /// outputs are negated.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.report = StatusReport::default();

        let InputData { cmd, drift_rads } = *input_data;

        if !(cmd.steering_angle.is_finite() && cmd.throttle.is_finite() && drift_rads.is_finite())
        {
            return Err(DriveCtrlError::NonFiniteInput {
                steering_angle: cmd.steering_angle,
                throttle: cmd.throttle,
                drift_rads,
            });
        }

        let yaw = self.angle_to_yaw(cmd.steering_angle);

        let throttle = -cmd.throttle;
        let steering = -yaw - drift_rads * self.params.drift_gain;

        let output = OutputData {
            throttle: clamp(throttle, -1.0, 1.0),
            steering: clamp(steering, -1.0, 1.0),
        };

        self.report.throttle_limited = output.throttle != throttle;
        self.report.steering_limited = output.steering != steering;

        trace!("DriveCtrl output: {:?} ({:?})", output, self.report);

        Ok((output, self.report))
    }
}
