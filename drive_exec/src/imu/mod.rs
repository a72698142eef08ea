//! # Inertial measurement module
//!
//! The drive loop only needs the yaw rate from the IMU, which it uses to counter steering drift.
//! The full 9-axis sample is still read so that it can be logged and recorded.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`OrientationSensor`] implementation for Linux IIO devices.
pub mod iio;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use iio::{IioImu, ImuParams};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// An IMU providing motion samples.
pub trait OrientationSensor {
    /// Check that the sensor is present and responding.
    fn connected(&mut self) -> bool;

    /// Prepare the sensor for cyclic reads. Called once after a successful `connected` check.
    fn initialise(&mut self) -> Result<(), ImuError>;

    /// Read a fresh motion sample.
    fn read_motion(&mut self) -> Result<MotionSample, ImuError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A 9-axis motion sample in the sensor frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionSample {
    /// Linear acceleration.
    ///
    /// Units: meters/second^2
    pub accel_ms2: Vector3<f64>,

    /// Angular velocity.
    ///
    /// Units: radians/second
    pub gyro_rads: Vector3<f64>,

    /// Magnetic field strength.
    ///
    /// Units: gauss
    pub mag_gauss: Vector3<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImuError {
    #[error("The IMU is not connected")]
    NotConnected,

    #[error("Could not read IMU attribute {attr}: {source}")]
    ReadError {
        attr: String,
        source: std::io::Error,
    },

    #[error("IMU attribute {attr} contained an invalid value: {value:?}")]
    ParseError { attr: String, value: String },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionSample {
    /// Angular velocity about the vertical axis, the drift term of the drive loop.
    ///
    /// Units: radians/second
    pub fn yaw_rate_rads(&self) -> f64 {
        self.gyro_rads.z
    }
}

impl Default for MotionSample {
    fn default() -> Self {
        Self {
            accel_ms2: Vector3::zeros(),
            gyro_rads: Vector3::zeros(),
            mag_gauss: Vector3::zeros(),
        }
    }
}
