//! Autonomous pilot

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{trace, warn};

use super::{Command, InferenceModel};
use crate::vision::Frame;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pilot driving from the camera frame through an inference model.
///
/// Needs no input device, so it is always available.
pub struct AutonomousPilot {
    model: Box<dyn InferenceModel>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AutonomousPilot {
    pub fn new(model: Box<dyn InferenceModel>) -> Self {
        Self { model }
    }

    /// Predict the command for the frame, or stop if there is no frame or the model fails.
    pub fn decide(&self, frame: Option<&Frame>) -> Command {
        let frame = match frame {
            Some(f) => f,
            None => {
                trace!("No frame available, autonomous pilot holding neutral");
                return Command::neutral();
            }
        };

        match self.model.predict(frame) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("Inference failed: {}", e);
                Command::neutral()
            }
        }
    }
}
