//! Failover (mixed) pilot

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use std::rc::Rc;

use super::{AutonomousPilot, Command, ManualPilot};
use crate::vision::Frame;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The autonomous pilot, overridden by a manual device while the operator is using it.
///
/// The operator takes over simply by moving a stick out of the deadband and hands control back
/// by releasing it.
pub struct FailoverPilot {
    manual: ManualPilot,

    autonomous: Rc<AutonomousPilot>,

    /// Readings with both components within this distance of zero are treated as idle.
    deadband: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FailoverPilot {
    pub fn new(manual: ManualPilot, autonomous: Rc<AutonomousPilot>, deadband: f64) -> Self {
        Self {
            manual,
            autonomous,
            deadband,
        }
    }

    pub fn name(&self) -> String {
        format!("Mixed {}", self.manual.kind())
    }

    pub fn decide(&self, frame: Option<&Frame>) -> Command {
        match self.manual.poll() {
            Some(cmd) if !cmd.is_idle(self.deadband) => {
                trace!("Manual override: {:?}", cmd);
                cmd
            }
            _ => self.autonomous.decide(frame),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pilot::{
        test_utils::{scripted, test_frame, FixedModel},
        DeviceError, ManualKind,
    };

    #[test]
    fn test_failover_arbitration() {
        let auto_cmd = Command::new(-0.2, 0.6);
        let autonomous = Rc::new(AutonomousPilot::new(Box::new(FixedModel(auto_cmd))));

        let input = scripted(vec![
            // Operator steering
            Ok(Some(Command::new(0.4, 0.0))),
            // Sticks released, within the deadband
            Ok(Some(Command::new(0.01, -0.02))),
            // No signal
            Ok(None),
            // Device fault
            Err(DeviceError::Backend("disconnected".into())),
            // Operator throttle only
            Ok(Some(Command::new(0.0, -0.3))),
        ]);

        let pilot = FailoverPilot::new(
            ManualPilot::new(ManualKind::Gamepad, input),
            autonomous,
            0.05,
        );
        assert_eq!(pilot.name(), "Mixed Gamepad");

        let frame = test_frame();
        let decisions: Vec<Command> = (0..5).map(|_| pilot.decide(Some(&frame))).collect();

        assert_eq!(
            decisions,
            vec![
                Command::new(0.4, 0.0),
                auto_cmd,
                auto_cmd,
                auto_cmd,
                Command::new(0.0, -0.3),
            ]
        );
    }

    #[test]
    fn test_idle_operator_without_frame_is_neutral() {
        let autonomous = Rc::new(AutonomousPilot::new(Box::new(FixedModel(Command::new(
            0.9, 0.9,
        )))));
        let pilot = FailoverPilot::new(
            ManualPilot::new(ManualKind::Radio, scripted(vec![Ok(None)])),
            autonomous,
            0.05,
        );

        assert_eq!(pilot.decide(None), Command::neutral());
    }
}
