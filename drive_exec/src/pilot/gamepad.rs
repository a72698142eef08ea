//! Gamepad input
//!
//! The left stick's X axis steers and the right stick's Y axis sets the throttle. Gamepad
//! support needs `libudev` so it is only built with the `gamepad` feature, otherwise opening a
//! gamepad always fails with [`DeviceError::Unsupported`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

#[cfg(feature = "gamepad")]
use gilrs::{Axis, GamepadId, Gilrs};

use super::{Command, DeviceError, ManualInput};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The first gamepad connected when the input was opened.
pub struct GamepadInput {
    #[cfg(feature = "gamepad")]
    gilrs: Gilrs,

    #[cfg(feature = "gamepad")]
    id: GamepadId,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

#[cfg(feature = "gamepad")]
impl GamepadInput {
    /// Open the first connected gamepad.
    pub fn new() -> Result<Self, DeviceError> {
        let gilrs = Gilrs::new().map_err(|e| DeviceError::Backend(e.to_string()))?;

        let (id, gamepad) = gilrs
            .gamepads()
            .next()
            .ok_or_else(|| DeviceError::NotFound("gamepad".into()))?;

        log::info!("Using gamepad {} ({:?})", gamepad.name(), gamepad.power_info());

        Ok(Self { gilrs, id })
    }
}

#[cfg(feature = "gamepad")]
impl ManualInput for GamepadInput {
    fn read(&mut self) -> Result<Option<Command>, DeviceError> {
        // Drain the event queue so the cached axis state is current
        while self.gilrs.next_event().is_some() {}

        let gamepad = self
            .gilrs
            .connected_gamepad(self.id)
            .ok_or_else(|| DeviceError::NotFound("gamepad".into()))?;

        Ok(Some(Command::new(
            gamepad.value(Axis::LeftStickX) as f64,
            gamepad.value(Axis::RightStickY) as f64,
        )))
    }
}

#[cfg(not(feature = "gamepad"))]
impl GamepadInput {
    /// Always fails, gamepad support was not built.
    pub fn new() -> Result<Self, DeviceError> {
        Err(DeviceError::Unsupported("gamepad", "gamepad"))
    }
}

#[cfg(not(feature = "gamepad"))]
impl ManualInput for GamepadInput {
    fn read(&mut self) -> Result<Option<Command>, DeviceError> {
        Err(DeviceError::Unsupported("gamepad", "gamepad"))
    }
}

#[cfg(all(test, not(feature = "gamepad")))]
mod test {
    use super::*;

    #[test]
    fn test_gamepad_unsupported_without_feature() {
        assert!(matches!(
            GamepadInput::new(),
            Err(DeviceError::Unsupported(..))
        ));
    }
}
