//! # Rover state
//!
//! State shared between the drive loop and the remote control server. Every field is a single
//! atomic, written by one side and read by the other, so no locking is needed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::remote::LoopStatus;
use log::info;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Shared rover state, held in an `Arc` by the loop and the remote server.
#[derive(Debug)]
pub struct RoverState {
    pilot_names: Vec<String>,

    selected_pilot: AtomicUsize,

    recording: AtomicBool,

    /// Bit pattern of the last cycle's duration in seconds.
    last_cycle_time_bits: AtomicU64,

    num_cycles: AtomicU64,

    stop_requested: AtomicBool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StateError {
    #[error("Pilot index {index} is out of range, there are {num_pilots} pilots")]
    InvalidSelection { index: usize, num_pilots: usize },

    #[error("There is no pilot called {0:?}")]
    UnknownPilot(String),

    #[error("The rover state needs at least one pilot")]
    NoPilots,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RoverState {
    /// Create the state for the given pilots, with the first pilot selected and recording off.
    pub fn new(pilot_names: Vec<String>) -> Result<Self, StateError> {
        if pilot_names.is_empty() {
            return Err(StateError::NoPilots);
        }

        Ok(Self {
            pilot_names,
            selected_pilot: AtomicUsize::new(0),
            recording: AtomicBool::new(false),
            last_cycle_time_bits: AtomicU64::new(0f64.to_bits()),
            num_cycles: AtomicU64::new(0),
            stop_requested: AtomicBool::new(false),
        })
    }

    pub fn pilot_names(&self) -> &[String] {
        &self.pilot_names
    }

    pub fn num_pilots(&self) -> usize {
        self.pilot_names.len()
    }

    pub fn selected_pilot(&self) -> usize {
        self.selected_pilot.load(Ordering::Relaxed)
    }

    /// Select the pilot with the given index. An out of range index leaves the selection as is.
    pub fn select_pilot(&self, index: usize) -> Result<(), StateError> {
        if index >= self.num_pilots() {
            return Err(StateError::InvalidSelection {
                index,
                num_pilots: self.num_pilots(),
            });
        }

        if self.selected_pilot.swap(index, Ordering::Relaxed) != index {
            info!("Pilot {} ({}) selected", index, self.pilot_names[index]);
        }

        Ok(())
    }

    /// Select the pilot with the given name, returning its index.
    pub fn select_pilot_by_name(&self, name: &str) -> Result<usize, StateError> {
        let index = self
            .pilot_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| StateError::UnknownPilot(name.into()))?;

        self.select_pilot(index)?;

        Ok(index)
    }

    pub fn recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    /// Flip the recording flag, returning the new value.
    pub fn toggle_recording(&self) -> bool {
        let recording = !self.recording.fetch_xor(true, Ordering::Relaxed);
        info!("Recording {}", if recording { "on" } else { "off" });
        recording
    }

    pub fn set_recording(&self, recording: bool) {
        if self.recording.swap(recording, Ordering::Relaxed) != recording {
            info!("Recording {}", if recording { "on" } else { "off" });
        }
    }

    /// Record the end of a cycle whose work took `cycle_time_s` seconds.
    pub fn record_cycle(&self, cycle_time_s: f64) {
        self.last_cycle_time_bits
            .store(cycle_time_s.to_bits(), Ordering::Relaxed);
        self.num_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Duration of the work done in the last cycle.
    ///
    /// Units: seconds
    pub fn last_cycle_time_s(&self) -> f64 {
        f64::from_bits(self.last_cycle_time_bits.load(Ordering::Relaxed))
    }

    pub fn num_cycles(&self) -> u64 {
        self.num_cycles.load(Ordering::Relaxed)
    }

    /// Ask the drive loop to stop at the start of its next cycle.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Relaxed);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Relaxed)
    }

    /// Snapshot of the state for the operator.
    pub fn status(&self) -> LoopStatus {
        LoopStatus {
            selected_pilot: self.selected_pilot(),
            pilot_names: self.pilot_names.clone(),
            recording: self.recording(),
            last_cycle_time_s: self.last_cycle_time_s(),
            num_cycles: self.num_cycles(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn state() -> RoverState {
        RoverState::new(vec!["Radio".into(), "Mixed Radio".into(), "Autonomous".into()]).unwrap()
    }

    #[test]
    fn test_select_pilot() {
        let state = state();
        assert_eq!(state.selected_pilot(), 0);

        state.select_pilot(2).unwrap();
        state.select_pilot(2).unwrap();
        assert_eq!(state.selected_pilot(), 2);

        assert_eq!(
            state.select_pilot(3),
            Err(StateError::InvalidSelection {
                index: 3,
                num_pilots: 3
            })
        );
        assert_eq!(state.selected_pilot(), 2);
    }

    #[test]
    fn test_select_pilot_by_name() {
        let state = state();

        assert_eq!(state.select_pilot_by_name("Mixed Radio"), Ok(1));
        assert_eq!(state.selected_pilot(), 1);

        assert_eq!(
            state.select_pilot_by_name("Gamepad"),
            Err(StateError::UnknownPilot("Gamepad".into()))
        );
        assert_eq!(state.selected_pilot(), 1);
    }

    #[test]
    fn test_recording_flag() {
        let state = state();
        assert!(!state.recording());

        assert!(state.toggle_recording());
        assert!(state.recording());
        assert!(!state.toggle_recording());

        state.set_recording(true);
        state.set_recording(true);
        assert!(state.recording());
    }

    #[test]
    fn test_cycle_timing_and_status() {
        let state = state();
        state.record_cycle(0.012);
        state.record_cycle(0.034);

        let status = state.status();
        assert_eq!(status.num_cycles, 2);
        assert_eq!(status.last_cycle_time_s, 0.034);
        assert_eq!(status.pilot_names.len(), 3);
        assert!(!status.recording);
    }

    #[test]
    fn test_no_pilots_rejected() {
        assert_eq!(RoverState::new(vec![]).unwrap_err(), StateError::NoPilots);
    }
}
