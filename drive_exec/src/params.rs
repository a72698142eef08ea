//! # Drive Executable Parameters
//!
//! Parameters for the drive executable, loaded from `params/drive_exec.toml`. Every section is
//! optional and falls back to its defaults.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use crate::{
    drive_ctrl, imu::ImuParams, pilot::RcParams, status_led::LedParams, vision::CameraParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DriveExecParams {
    pub cycle: CycleParams,

    pub drive_ctrl: drive_ctrl::Params,

    pub pwm: PwmParams,

    pub imu: ImuParams,

    pub rc: RcParams,

    pub manual: ManualParams,

    pub camera: CameraParams,

    pub led: LedParams,
}

/// Timing of the drive loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CycleParams {
    /// Delay added after each cycle's work.
    ///
    /// Units: seconds
    pub cycle_delay_s: f64,

    /// Cycles whose work takes longer than this are logged.
    ///
    /// Units: seconds
    pub cycle_warn_s: f64,
}

/// PWM outputs driving the ESC and steering servo.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PwmParams {
    /// Number of the sysfs PWM chip, `/sys/class/pwm/pwmchip<chip>`.
    pub chip: u32,

    /// Carrier frequency.
    ///
    /// Units: Hertz
    pub period_hz: f64,

    pub throttle_channel: u32,

    pub steering_channel: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManualParams {
    /// Manual readings with both components within this distance of zero are idle, handing
    /// control back to the autonomous pilot in the mixed modes.
    pub deadband: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            cycle_delay_s: 0.05,
            cycle_warn_s: 0.1,
        }
    }
}

impl Default for PwmParams {
    fn default() -> Self {
        Self {
            chip: 0,
            period_hz: 50.0,
            throttle_channel: 2,
            steering_channel: 0,
        }
    }
}

impl Default for ManualParams {
    fn default() -> Self {
        Self { deadband: 0.05 }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_params_use_defaults() {
        let params: DriveExecParams = util::params::from_toml_str(
            r#"
            [cycle]
            cycle_delay_s = 0.02

            [drive_ctrl]
            drift_gain = 0.5

            [rc]
            reverse_throttle = true
            "#,
        )
        .unwrap();

        assert_eq!(params.cycle.cycle_delay_s, 0.02);
        assert_eq!(params.cycle.cycle_warn_s, 0.1);
        assert_eq!(params.drive_ctrl.drift_gain, 0.5);
        assert_eq!(params.drive_ctrl.max_steering_angle, 1.0);
        assert_eq!(params.pwm.period_hz, 50.0);
        assert_eq!(params.pwm.throttle_channel, 2);
        assert!(params.rc.reverse_throttle);
        assert_eq!(params.manual.deadband, 0.05);
        assert_eq!(params.camera.fps, 20);
        assert_eq!(params.pwm.chip, 0);
        assert!(!params.led.active_low);
    }
}
