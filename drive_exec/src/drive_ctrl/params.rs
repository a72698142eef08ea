//! Parameters structure for DriveCtrl

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Steering correction applied per unit of yaw rate.
    ///
    /// Units: 1/(radians/second)
    pub drift_gain: f64,

    /// Steering angle commanded for a full lock demand.
    pub max_steering_angle: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            drift_gain: 1.0,
            max_steering_angle: 1.0,
        }
    }
}
