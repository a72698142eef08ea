//! Registry of the pilots available for selection

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use std::rc::Rc;

use super::{
    AutonomousPilot, DeviceError, FailoverPilot, ManualKind, ManualPilot, Pilot, SharedInput,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// All pilots which could be built, in selection index order.
///
/// The autonomous pilot is always present and always last, so the registry is never empty.
pub struct PilotRegistry {
    pilots: Vec<Pilot>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PilotRegistry {
    /// Build the registry from the outcome of opening each manual device.
    ///
    /// Each device that opened adds a manual pilot followed by a failover pilot built on it,
    /// gamepad first. Devices that failed are logged and left out.
    pub fn setup(
        autonomous: Rc<AutonomousPilot>,
        gamepad: Result<SharedInput, DeviceError>,
        radio: Result<SharedInput, DeviceError>,
        deadband: f64,
    ) -> Self {
        let mut pilots = Vec::new();

        let devices = vec![(ManualKind::Gamepad, gamepad), (ManualKind::Radio, radio)];

        for (kind, device) in devices {
            let input = match device {
                Ok(i) => i,
                Err(e) => {
                    warn!("{} pilots unavailable: {}", kind, e);
                    continue;
                }
            };

            let manual = ManualPilot::new(kind, input.clone());
            pilots.push(match kind {
                ManualKind::Gamepad => Pilot::Gamepad(manual),
                ManualKind::Radio => Pilot::Radio(manual),
            });
            pilots.push(Pilot::Failover(FailoverPilot::new(
                ManualPilot::new(kind, input),
                autonomous.clone(),
                deadband,
            )));
        }

        pilots.push(Pilot::Autonomous(autonomous));

        let registry = Self { pilots };
        info!("Available pilots: {:?}", registry.names());

        registry
    }

    /// Pilot names in selection index order.
    pub fn names(&self) -> Vec<String> {
        self.pilots.iter().map(Pilot::name).collect()
    }

    pub fn len(&self) -> usize {
        self.pilots.len()
    }

    /// Always false, kept alongside `len`.
    pub fn is_empty(&self) -> bool {
        self.pilots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pilot> {
        self.pilots.get(index)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pilot::{
        test_utils::{scripted, FixedModel},
        Command,
    };

    fn autonomous() -> Rc<AutonomousPilot> {
        Rc::new(AutonomousPilot::new(Box::new(FixedModel(Command::neutral()))))
    }

    #[test]
    fn test_no_devices_leaves_autonomous() {
        let registry = PilotRegistry::setup(
            autonomous(),
            Err(DeviceError::NotFound("gamepad".into())),
            Err(DeviceError::NotFound("RC receiver".into())),
            0.05,
        );

        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert_eq!(registry.names(), vec!["Autonomous"]);
        assert!(matches!(registry.get(0), Some(Pilot::Autonomous(_))));
        assert!(registry.get(1).is_none());
    }

    #[test]
    fn test_all_devices_order() {
        let registry = PilotRegistry::setup(
            autonomous(),
            Ok(scripted(vec![])),
            Ok(scripted(vec![])),
            0.05,
        );

        assert_eq!(
            registry.names(),
            vec![
                "Gamepad",
                "Mixed Gamepad",
                "Radio",
                "Mixed Radio",
                "Autonomous"
            ]
        );
    }

    #[test]
    fn test_radio_only() {
        let registry = PilotRegistry::setup(
            autonomous(),
            Err(DeviceError::Unsupported("gamepad", "gamepad")),
            Ok(scripted(vec![])),
            0.05,
        );

        assert_eq!(registry.names(), vec!["Radio", "Mixed Radio", "Autonomous"]);
        assert!(matches!(registry.get(0), Some(Pilot::Radio(_))));
    }
}
