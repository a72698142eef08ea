//! Drive control module
//!
//! Turns the pilot's command into normalised throttle and steering demands, countering the
//! rover's measured yaw drift.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod state;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Maximum steering angle must be positive and finite, got {0}")]
    InvalidMaxSteeringAngle(f64),

    #[error("Drift gain must be finite, got {0}")]
    InvalidDriftGain(f64),

    #[error("Received a non-finite input (command: {steering_angle}, {throttle}, drift: {drift_rads})")]
    NonFiniteInput {
        steering_angle: f64,
        throttle: f64,
        drift_rads: f64,
    },
}
