//! RC receiver input through the Navio2 RC-IO sysfs interface
//!
//! The `rcio` kernel module exposes each decoded receiver channel as `<rcin_dir>/ch<N>`, holding
//! the current pulse width in microseconds. A width of zero means the receiver has no signal.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use util::maths::{clamp, lin_map};

use super::{Command, DeviceError, ManualInput};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the RC receiver.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RcParams {
    /// Directory holding the receiver channel files.
    pub rcin_dir: PathBuf,

    pub steering_channel: u32,

    pub throttle_channel: u32,

    /// Pulse width of a full left/reverse stick.
    ///
    /// Units: microseconds
    pub pulse_min_us: f64,

    /// Pulse width of a full right/forward stick.
    ///
    /// Units: microseconds
    pub pulse_max_us: f64,

    pub reverse_steering: bool,

    pub reverse_throttle: bool,
}

/// RC receiver read through sysfs.
pub struct RcInput {
    params: RcParams,

    steering_path: PathBuf,

    throttle_path: PathBuf,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for RcParams {
    fn default() -> Self {
        Self {
            rcin_dir: PathBuf::from("/sys/kernel/rcio/rcin"),
            steering_channel: 0,
            throttle_channel: 2,
            pulse_min_us: 1000.0,
            pulse_max_us: 2000.0,
            reverse_steering: false,
            reverse_throttle: false,
        }
    }
}

impl RcInput {
    /// Open the receiver, failing with [`DeviceError::NotFound`] if either channel is missing.
    pub fn new(params: &RcParams) -> Result<Self, DeviceError> {
        let steering_path = channel_path(&params.rcin_dir, params.steering_channel);
        let throttle_path = channel_path(&params.rcin_dir, params.throttle_channel);

        for path in [&steering_path, &throttle_path].iter() {
            if !path.is_file() {
                return Err(DeviceError::NotFound(format!(
                    "RC receiver channel {}",
                    path.display()
                )));
            }
        }

        debug!("RC receiver found at {:?}", params.rcin_dir);

        Ok(Self {
            params: params.clone(),
            steering_path,
            throttle_path,
        })
    }

    fn normalise(&self, pulse_us: f64, reverse: bool) -> f64 {
        let value = clamp(
            lin_map(
                (self.params.pulse_min_us, self.params.pulse_max_us),
                (-1.0, 1.0),
                pulse_us,
            ),
            -1.0,
            1.0,
        );

        if reverse {
            -value
        } else {
            value
        }
    }
}

impl ManualInput for RcInput {
    fn read(&mut self) -> Result<Option<Command>, DeviceError> {
        let steering_us = read_pulse(&self.steering_path)?;
        let throttle_us = read_pulse(&self.throttle_path)?;

        if steering_us == 0 || throttle_us == 0 {
            return Ok(None);
        }

        Ok(Some(Command::new(
            self.normalise(steering_us as f64, self.params.reverse_steering),
            self.normalise(throttle_us as f64, self.params.reverse_throttle),
        )))
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn channel_path(rcin_dir: &Path, channel: u32) -> PathBuf {
    rcin_dir.join(format!("ch{}", channel))
}

fn read_pulse(path: &Path) -> Result<u32, DeviceError> {
    let value = fs::read_to_string(path).map_err(|e| DeviceError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    value
        .trim()
        .parse()
        .map_err(|_| DeviceError::InvalidReading(value))
}

#[cfg(test)]
mod test {
    use super::*;

    fn rcin_dir(name: &str, steering: &str, throttle: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("drive_rcin_{}_{}", name, std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ch0"), steering).unwrap();
        fs::write(dir.join("ch2"), throttle).unwrap();
        dir
    }

    fn params(dir: &Path) -> RcParams {
        RcParams {
            rcin_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pulses_map_to_command() {
        let dir = rcin_dir("map", "1750\n", "1000\n");
        let mut rc = RcInput::new(&params(&dir)).unwrap();

        assert_eq!(rc.read().unwrap(), Some(Command::new(0.5, -1.0)));

        // Out of range pulses are limited
        fs::write(dir.join("ch0"), "2200\n").unwrap();
        assert_eq!(rc.read().unwrap(), Some(Command::new(1.0, -1.0)));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_reversed_channels() {
        let dir = rcin_dir("reverse", "1250\n", "2000\n");
        let mut rc = RcInput::new(&RcParams {
            reverse_steering: true,
            reverse_throttle: true,
            ..params(&dir)
        })
        .unwrap();

        assert_eq!(rc.read().unwrap(), Some(Command::new(0.5, -1.0)));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_no_signal_is_a_miss() {
        let dir = rcin_dir("nosignal", "0\n", "1500\n");
        let mut rc = RcInput::new(&params(&dir)).unwrap();

        assert_eq!(rc.read().unwrap(), None);

        fs::write(dir.join("ch0"), "garbage").unwrap();
        assert!(matches!(rc.read(), Err(DeviceError::InvalidReading(_))));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_receiver_not_found() {
        let dir = std::env::temp_dir().join("drive_rcin_does_not_exist");

        assert!(matches!(
            RcInput::new(&params(&dir)),
            Err(DeviceError::NotFound(_))
        ));
    }
}
