//! # Drive library
//!
//! Components of the drive executable, exposed as a library for the integration tests and
//! benchmarks.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuators - servo/ESC PWM channels
pub mod actuator;

/// Drive loop - decide, correct and actuate once per cycle
pub mod control_loop;

/// Drive control - converts pilot commands into drift corrected actuator demands
pub mod drive_ctrl;

/// IMU - yaw rate measurement
pub mod imu;

/// Executable parameters
pub mod params;

/// Pilots - the manual, autonomous and mixed sources of driving commands
pub mod pilot;

/// Frame recorder - stores frames and commands as training data
pub mod recorder;

/// Remote control server - operator commands over the network
pub mod remote_server;

/// Shared rover state
pub mod state;

/// Status LED - startup progress on the board's RGB LED
pub mod status_led;

/// Vision - background frame capture
pub mod vision;
