//! # Pilot module
//!
//! A pilot decides the steering and throttle command for each cycle. The available pilots are a
//! closed set:
//!
//! - `Radio` and `Gamepad`: a human driving through a manual input device,
//! - `Autonomous`: a neural network driving from the camera frame,
//! - `Failover`: the autonomous pilot, overridden by a manual device whenever the operator
//!   touches the controls.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod autonomous;
mod failover;
mod gamepad;
mod manual;
mod model;
mod radio;
mod registry;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use autonomous::AutonomousPilot;
pub use failover::FailoverPilot;
pub use gamepad::GamepadInput;
pub use manual::{ManualInput, ManualKind, ManualPilot, SharedInput};
pub use model::{CategoricalModel, InferenceModel, ModelError};
pub use radio::{RcInput, RcParams};
pub use registry::PilotRegistry;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use std::rc::Rc;

use crate::vision::Frame;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A driving command produced by a pilot.
///
/// Both values are nominally in `[-1, 1]` but are not limited until actuation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Command {
    /// Steering angle, positive to the right.
    pub steering_angle: f64,

    /// Throttle, positive forwards.
    pub throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The set of pilots available to the drive loop.
pub enum Pilot {
    Radio(ManualPilot),
    Gamepad(ManualPilot),
    Autonomous(Rc<AutonomousPilot>),
    Failover(FailoverPilot),
}

/// Errors raised while opening a manual input device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("The {0} was not found")]
    NotFound(String),

    #[error("Support for the {0} was not enabled at build time (feature `{1}`)")]
    Unsupported(&'static str, &'static str),

    #[error("Could not read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    #[error("Device returned an invalid reading: {0:?}")]
    InvalidReading(String),

    #[error("Input backend error: {0}")]
    Backend(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Command {
    pub fn new(steering_angle: f64, throttle: f64) -> Self {
        Self {
            steering_angle,
            throttle,
        }
    }

    /// The command which holds the rover still with the wheels centred.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// True if both components are within `deadband` of zero.
    pub fn is_idle(&self, deadband: f64) -> bool {
        self.steering_angle.abs() <= deadband && self.throttle.abs() <= deadband
    }
}

impl Pilot {
    /// Name shown to the operator.
    pub fn name(&self) -> String {
        match self {
            Pilot::Radio(_) => ManualKind::Radio.to_string(),
            Pilot::Gamepad(_) => ManualKind::Gamepad.to_string(),
            Pilot::Autonomous(_) => "Autonomous".into(),
            Pilot::Failover(f) => f.name(),
        }
    }

    /// Decide this cycle's command from the latest frame, if there is one.
    pub fn decide(&self, frame: Option<&Frame>) -> Command {
        match self {
            Pilot::Radio(m) | Pilot::Gamepad(m) => m.decide(),
            Pilot::Autonomous(a) => a.decide(frame),
            Pilot::Failover(f) => f.decide(frame),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    //! Scripted devices and models shared by the pilot tests.

    use super::*;
    use std::{cell::RefCell, collections::VecDeque};

    /// Manual input replaying a fixed sequence of readings, then reporting no reading.
    pub struct ScriptedInput {
        pub readings: VecDeque<Result<Option<Command>, DeviceError>>,
    }

    impl ManualInput for ScriptedInput {
        fn read(&mut self) -> Result<Option<Command>, DeviceError> {
            self.readings.pop_front().unwrap_or(Ok(None))
        }
    }

    pub fn scripted(readings: Vec<Result<Option<Command>, DeviceError>>) -> SharedInput {
        Rc::new(RefCell::new(ScriptedInput {
            readings: readings.into(),
        }))
    }

    /// Model which always predicts the same command.
    pub struct FixedModel(pub Command);

    impl InferenceModel for FixedModel {
        fn predict(&self, _frame: &Frame) -> Result<Command, ModelError> {
            Ok(self.0)
        }
    }

    pub fn test_frame() -> Frame {
        Frame {
            timestamp: chrono::Utc::now(),
            image: image::DynamicImage::new_luma8(4, 4),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_command_idle() {
        assert!(Command::neutral().is_idle(0.0));
        assert!(Command::new(0.04, -0.05).is_idle(0.05));
        assert!(!Command::new(0.0, 0.06).is_idle(0.05));
        assert!(!Command::new(-0.3, 0.0).is_idle(0.05));
    }
}
