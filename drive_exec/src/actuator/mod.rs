//! # Actuator module
//!
//! Provides the [`ActuatorChannel`], which converts normalised demands into servo/ESC style PWM
//! pulses, and the [`PwmOutput`] trait which abstracts over the hardware producing those pulses.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`PwmOutput`] implementation for the Linux sysfs PWM interface.
pub mod sysfs_pwm;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use sysfs_pwm::SysfsPwm;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Pulse width at which the servo is centred and the ESC stopped.
///
/// Units: milliseconds
pub const NEUTRAL_DUTY_MS: f64 = 1.5;

/// Pulse width change between neutral and a full scale demand.
///
/// Units: milliseconds
pub const HALF_RANGE_DUTY_MS: f64 = 0.5;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A single hardware PWM output.
pub trait PwmOutput {
    /// Set the carrier frequency of the output.
    fn set_period_hz(&mut self, period_hz: f64) -> Result<(), PwmError>;

    /// Set the pulse width of the output.
    fn set_duty_ms(&mut self, duty_ms: f64) -> Result<(), PwmError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One actuator (throttle or steering) driven by a PWM output.
pub struct ActuatorChannel {
    name: &'static str,

    output: Box<dyn PwmOutput>,

    /// Last pulse width successfully written, or `None` before the first write.
    last_duty_ms: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum PwmError {
    #[error("Could not {action} PWM channel {channel}: {source}")]
    Hardware {
        channel: u32,
        action: &'static str,
        source: ::sysfs_pwm::Error,
    },

    #[error("Carrier frequency must be positive and finite, got {0} Hz")]
    InvalidPeriod(f64),

    #[error("A {duty_ms} ms pulse does not fit in the {period_ms} ms carrier period")]
    InvalidDuty { duty_ms: f64, period_ms: f64 },
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a normalised demand into a pulse width.
///
/// The mapping is `NEUTRAL_DUTY_MS + value * HALF_RANGE_DUTY_MS`, so `[-1, 1]` spans 1.0 ms to
/// 2.0 ms. Values outside `[-1, 1]` are not limited here.
pub fn normalised_to_duty_ms(value: f64) -> f64 {
    NEUTRAL_DUTY_MS + value * HALF_RANGE_DUTY_MS
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActuatorChannel {
    /// Wrap a PWM output as a named actuator channel.
    pub fn new(name: &'static str, output: Box<dyn PwmOutput>) -> Self {
        Self {
            name,
            output,
            last_duty_ms: None,
        }
    }

    /// Name of the channel, used in log messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Set the carrier frequency of the underlying output.
    pub fn set_period_hz(&mut self, period_hz: f64) -> Result<(), PwmError> {
        self.output.set_period_hz(period_hz)
    }

    /// Push a normalised demand to the output, returning the pulse width written.
    ///
    /// The caller is responsible for limiting `value` to `[-1, 1]`.
    pub fn set_normalised(&mut self, value: f64) -> Result<f64, PwmError> {
        let duty_ms = normalised_to_duty_ms(value);

        self.output.set_duty_ms(duty_ms)?;
        self.last_duty_ms = Some(duty_ms);

        Ok(duty_ms)
    }

    /// The last pulse width written to the output.
    pub fn last_duty_ms(&self) -> Option<f64> {
        self.last_duty_ms
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    struct RecordingPwm {
        duties: Rc<RefCell<Vec<f64>>>,
        fail: bool,
    }

    impl PwmOutput for RecordingPwm {
        fn set_period_hz(&mut self, _period_hz: f64) -> Result<(), PwmError> {
            Ok(())
        }

        fn set_duty_ms(&mut self, duty_ms: f64) -> Result<(), PwmError> {
            if self.fail {
                return Err(PwmError::InvalidDuty {
                    duty_ms,
                    period_ms: 0.0,
                });
            }
            self.duties.borrow_mut().push(duty_ms);
            Ok(())
        }
    }

    #[test]
    fn test_duty_mapping() {
        assert_eq!(normalised_to_duty_ms(0.0), 1.5);
        assert_eq!(normalised_to_duty_ms(1.0), 2.0);
        assert_eq!(normalised_to_duty_ms(-1.0), 1.0);

        // Linear and bounded over the whole normalised range
        for i in -100..=100 {
            let v = i as f64 / 100.0;
            let duty = normalised_to_duty_ms(v);
            assert!((1.0..=2.0).contains(&duty));
            assert!((duty - (1.5 + 0.5 * v)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_channel_tracks_last_duty() {
        let duties = Rc::new(RefCell::new(Vec::new()));
        let mut chan = ActuatorChannel::new(
            "throttle",
            Box::new(RecordingPwm {
                duties: duties.clone(),
                fail: false,
            }),
        );

        assert_eq!(chan.last_duty_ms(), None);
        assert_eq!(chan.set_normalised(-0.5).unwrap(), 1.25);
        assert_eq!(chan.set_normalised(0.5).unwrap(), 1.75);
        assert_eq!(chan.last_duty_ms(), Some(1.75));
        assert_eq!(*duties.borrow(), vec![1.25, 1.75]);
    }

    #[test]
    fn test_failed_write_keeps_last_duty() {
        let mut chan = ActuatorChannel::new(
            "steering",
            Box::new(RecordingPwm {
                duties: Rc::new(RefCell::new(Vec::new())),
                fail: true,
            }),
        );

        assert!(chan.set_normalised(0.2).is_err());
        assert_eq!(chan.last_duty_ms(), None);
    }
}
