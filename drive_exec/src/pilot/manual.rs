//! Manual pilots, driven by an operator through an input device

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{trace, warn};
use std::{cell::RefCell, fmt, rc::Rc};

use super::{Command, DeviceError};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// An input device the operator drives the rover with.
pub trait ManualInput {
    /// Read the operator's current demand.
    ///
    /// Returns `Ok(None)` if the device has no fresh reading this cycle.
    fn read(&mut self) -> Result<Option<Command>, DeviceError>;
}

/// A manual input device shared between the pilots that read it.
pub type SharedInput = Rc<RefCell<dyn ManualInput>>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pilot which forwards the operator's demand from an input device.
pub struct ManualPilot {
    kind: ManualKind,

    input: SharedInput,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The kinds of manual input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualKind {
    Radio,
    Gamepad,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ManualPilot {
    pub fn new(kind: ManualKind, input: SharedInput) -> Self {
        Self { kind, input }
    }

    pub fn kind(&self) -> ManualKind {
        self.kind
    }

    /// Read the device, returning `None` on a miss or an error.
    pub fn poll(&self) -> Option<Command> {
        match self.input.borrow_mut().read() {
            Ok(Some(cmd)) => Some(cmd),
            Ok(None) => {
                trace!("No reading from the {}", self.kind);
                None
            }
            Err(e) => {
                warn!("Could not read the {}: {}", self.kind, e);
                None
            }
        }
    }

    /// The operator's demand, or the neutral command if there isn't one.
    pub fn decide(&self) -> Command {
        self.poll().unwrap_or_else(Command::neutral)
    }
}

impl fmt::Display for ManualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManualKind::Radio => write!(f, "Radio"),
            ManualKind::Gamepad => write!(f, "Gamepad"),
        }
    }
}
