//! [`OrientationSensor`] implementation for Linux IIO devices
//!
//! The kernel's `inv-mpu6050` driver exposes the Navio2's MPU9250 as an IIO device. Each channel
//! has a `_raw` attribute which is multiplied by the channel type's `_scale` to get SI units.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{ImuError, MotionSample, OrientationSensor};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the IIO IMU.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImuParams {
    /// The IIO device directory, for example `/sys/bus/iio/devices/iio:device0`.
    pub device_dir: PathBuf,

    /// Accepted values of the device's `name` attribute.
    pub device_names: Vec<String>,
}

/// An IMU read through the IIO sysfs interface.
pub struct IioImu {
    params: ImuParams,

    /// Scale factors found during initialisation, `None` for channel types the device lacks.
    scales: Option<Scales>,
}

#[derive(Debug, Clone, Copy)]
struct Scales {
    accel: f64,
    anglvel: f64,
    magn: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ImuParams {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
            device_names: vec!["mpu9250".into(), "mpu9255".into()],
        }
    }
}

impl IioImu {
    pub fn new(params: &ImuParams) -> Self {
        Self {
            params: params.clone(),
            scales: None,
        }
    }

    fn read_vector(&self, channel: &str, scale: f64) -> Result<Vector3<f64>, ImuError> {
        let x = read_f64(&self.params.device_dir, &format!("in_{}_x_raw", channel))?;
        let y = read_f64(&self.params.device_dir, &format!("in_{}_y_raw", channel))?;
        let z = read_f64(&self.params.device_dir, &format!("in_{}_z_raw", channel))?;

        Ok(Vector3::new(x, y, z) * scale)
    }
}

impl OrientationSensor for IioImu {
    fn connected(&mut self) -> bool {
        match fs::read_to_string(self.params.device_dir.join("name")) {
            Ok(name) => {
                let name = name.trim();
                let known = self.params.device_names.iter().any(|n| n == name);
                if !known {
                    warn!(
                        "IIO device {:?} is a {:?}, expected one of {:?}",
                        self.params.device_dir, name, self.params.device_names
                    );
                }
                known
            }
            Err(e) => {
                debug!("Could not read IIO device name: {}", e);
                false
            }
        }
    }

    fn initialise(&mut self) -> Result<(), ImuError> {
        let dir = &self.params.device_dir;

        let magn = match read_f64(dir, "in_magn_scale") {
            Ok(s) => Some(s),
            Err(ImuError::ReadError { .. }) => {
                info!("IMU has no magnetometer channels, magnetic field will read zero");
                None
            }
            Err(e) => return Err(e),
        };

        let scales = Scales {
            accel: read_f64(dir, "in_accel_scale")?,
            anglvel: read_f64(dir, "in_anglvel_scale")?,
            magn,
        };

        debug!("IMU scales: {:?}", scales);
        self.scales = Some(scales);

        Ok(())
    }

    fn read_motion(&mut self) -> Result<MotionSample, ImuError> {
        let scales = self.scales.ok_or(ImuError::NotConnected)?;

        Ok(MotionSample {
            accel_ms2: self.read_vector("accel", scales.accel)?,
            gyro_rads: self.read_vector("anglvel", scales.anglvel)?,
            mag_gauss: match scales.magn {
                Some(s) => self.read_vector("magn", s)?,
                None => Vector3::zeros(),
            },
        })
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn read_f64(dir: &Path, attr: &str) -> Result<f64, ImuError> {
    let value = fs::read_to_string(dir.join(attr)).map_err(|e| ImuError::ReadError {
        attr: attr.into(),
        source: e,
    })?;

    value.trim().parse().map_err(|_| ImuError::ParseError {
        attr: attr.into(),
        value,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn device_dir(name: &str, attrs: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "drive_iio_{}_{}",
            name,
            std::process::id()
        ));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        for (attr, value) in attrs {
            fs::write(dir.join(attr), value).unwrap();
        }
        dir
    }

    fn imu(dir: &Path) -> IioImu {
        IioImu::new(&ImuParams {
            device_dir: dir.to_path_buf(),
            ..Default::default()
        })
    }

    const MOTION_ATTRS: [(&str, &str); 8] = [
        ("name", "mpu9250\n"),
        ("in_accel_scale", "0.5\n"),
        ("in_accel_x_raw", "2\n"),
        ("in_accel_y_raw", "-4\n"),
        ("in_accel_z_raw", "20\n"),
        ("in_anglvel_scale", "0.25\n"),
        ("in_anglvel_x_raw", "0\n"),
        ("in_anglvel_y_raw", "4\n"),
    ];

    #[test]
    fn test_connected_checks_name() {
        let dir = device_dir("name", &[("name", "mpu9250\n")]);
        assert!(imu(&dir).connected());

        fs::write(dir.join("name"), "bmp280\n").unwrap();
        assert!(!imu(&dir).connected());

        fs::remove_dir_all(&dir).ok();
        assert!(!imu(&dir).connected());
    }

    #[test]
    fn test_read_motion_scales_raw_values() {
        let dir = device_dir("motion", &MOTION_ATTRS);
        fs::write(dir.join("in_anglvel_z_raw"), "-2\n").unwrap();

        let mut imu = imu(&dir);
        assert!(matches!(imu.read_motion(), Err(ImuError::NotConnected)));

        imu.initialise().unwrap();
        let sample = imu.read_motion().unwrap();

        assert_eq!(sample.accel_ms2, Vector3::new(1.0, -2.0, 10.0));
        assert_eq!(sample.gyro_rads, Vector3::new(0.0, 1.0, -0.5));
        assert_eq!(sample.mag_gauss, Vector3::zeros());
        assert_eq!(sample.yaw_rate_rads(), -0.5);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_garbage_value_is_parse_error() {
        let dir = device_dir("garbage", &MOTION_ATTRS);
        fs::write(dir.join("in_anglvel_z_raw"), "busy\n").unwrap();

        let mut imu = imu(&dir);
        imu.initialise().unwrap();

        assert!(matches!(
            imu.read_motion(),
            Err(ImuError::ParseError { .. })
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
