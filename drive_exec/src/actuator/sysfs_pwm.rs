//! [`PwmOutput`] implementation for the Linux sysfs PWM interface
//!
//! The Navio2 RC outputs are exposed as channels of `/sys/class/pwm/pwmchip<N>`. Access goes
//! through the `sysfs_pwm` crate, this module only converts the loop's units into the
//! nanosecond times the kernel expects and rejects values the hardware cannot produce.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use sysfs_pwm::Pwm;

use super::{PwmError, PwmOutput};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const NANOS_PER_SECOND: f64 = 1e9;

const NANOS_PER_MILLI: f64 = 1e6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single exported sysfs PWM channel.
pub struct SysfsPwm {
    channel: u32,

    pwm: Pwm,

    /// Carrier period once set, used to reject pulses longer than the period.
    period_ns: Option<u32>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SysfsPwm {
    /// Export the given channel of PWM chip `chip`.
    ///
    /// The output is only enabled once a carrier period has been set.
    pub fn new(chip: u32, channel: u32) -> Result<Self, PwmError> {
        let pwm = Pwm::new(chip, channel).map_err(|e| PwmError::Hardware {
            channel,
            action: "open",
            source: e,
        })?;

        debug!("Exporting PWM channel {} of pwmchip{}", channel, chip);
        pwm.export().map_err(|e| PwmError::Hardware {
            channel,
            action: "export",
            source: e,
        })?;

        Ok(Self {
            channel,
            pwm,
            period_ns: None,
        })
    }

    fn hardware_err(&self, action: &'static str) -> impl FnOnce(sysfs_pwm::Error) -> PwmError {
        let channel = self.channel;
        move |e| PwmError::Hardware {
            channel,
            action,
            source: e,
        }
    }
}

impl PwmOutput for SysfsPwm {
    fn set_period_hz(&mut self, period_hz: f64) -> Result<(), PwmError> {
        let period_ns = period_ns_from_hz(period_hz)?;

        self.pwm
            .set_period_ns(period_ns)
            .map_err(self.hardware_err("set period"))?;
        self.pwm
            .enable(true)
            .map_err(self.hardware_err("enable"))?;
        self.period_ns = Some(period_ns);

        Ok(())
    }

    fn set_duty_ms(&mut self, duty_ms: f64) -> Result<(), PwmError> {
        let duty_ns = duty_ns_from_ms(duty_ms, self.period_ns)?;

        self.pwm
            .set_duty_cycle_ns(duty_ns)
            .map_err(self.hardware_err("set duty cycle"))
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn period_ns_from_hz(period_hz: f64) -> Result<u32, PwmError> {
    if !period_hz.is_finite() || period_hz <= 0.0 {
        return Err(PwmError::InvalidPeriod(period_hz));
    }

    let period_ns = (NANOS_PER_SECOND / period_hz).round();

    // Below 1 Hz the period no longer fits the kernel's u32
    if period_ns > u32::MAX as f64 {
        return Err(PwmError::InvalidPeriod(period_hz));
    }

    Ok(period_ns as u32)
}

/// Convert a pulse width into nanoseconds, rejecting pulses that do not fit in the carrier
/// period. Before a period is set any non-negative pulse is accepted.
fn duty_ns_from_ms(duty_ms: f64, period_ns: Option<u32>) -> Result<u32, PwmError> {
    let period_ms = period_ns
        .map(|p| p as f64 / NANOS_PER_MILLI)
        .unwrap_or(u32::MAX as f64 / NANOS_PER_MILLI);

    if !duty_ms.is_finite() || duty_ms < 0.0 || duty_ms > period_ms {
        return Err(PwmError::InvalidDuty { duty_ms, period_ms });
    }

    Ok((duty_ms * NANOS_PER_MILLI).round() as u32)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_period_in_ns() {
        assert_eq!(period_ns_from_hz(50.0).unwrap(), 20_000_000);
        assert_eq!(period_ns_from_hz(400.0).unwrap(), 2_500_000);

        assert!(matches!(
            period_ns_from_hz(0.0),
            Err(PwmError::InvalidPeriod(_))
        ));
        assert!(matches!(
            period_ns_from_hz(std::f64::NAN),
            Err(PwmError::InvalidPeriod(_))
        ));
        assert!(matches!(
            period_ns_from_hz(0.1),
            Err(PwmError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_duty_in_ns() {
        let period = Some(20_000_000);

        assert_eq!(duty_ns_from_ms(1.5, period).unwrap(), 1_500_000);
        assert_eq!(duty_ns_from_ms(1.25, period).unwrap(), 1_250_000);
        assert_eq!(duty_ns_from_ms(1.5, None).unwrap(), 1_500_000);
    }

    #[test]
    fn test_invalid_duty_rejected() {
        let period = Some(20_000_000);

        assert!(matches!(
            duty_ns_from_ms(25.0, period),
            Err(PwmError::InvalidDuty { .. })
        ));
        assert!(matches!(
            duty_ns_from_ms(-0.1, period),
            Err(PwmError::InvalidDuty { .. })
        ));
        assert!(matches!(
            duty_ns_from_ms(std::f64::NAN, None),
            Err(PwmError::InvalidDuty { .. })
        ));
    }
}
