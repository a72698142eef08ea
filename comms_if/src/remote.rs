//! # Remote control messages
//!
//! Commands sent by an operator to the drive executable, and the responses it sends back. Both
//! are exchanged as JSON over a REQ/REP socket pair.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Snapshot of the drive loop reported to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopStatus {
    /// Index of the pilot currently in control.
    pub selected_pilot: usize,

    /// Names of all available pilots, in selection index order.
    pub pilot_names: Vec<String>,

    /// True if frames are being recorded.
    pub recording: bool,

    /// Duration of the work done in the last cycle.
    ///
    /// Units: seconds
    pub last_cycle_time_s: f64,

    /// Number of cycles executed since the loop started.
    pub num_cycles: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command issued by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
pub enum RemoteCmd {
    /// Get the current status of the drive loop.
    #[structopt(name = "status")]
    GetStatus,

    /// List the names of the available pilots.
    #[structopt(name = "pilots")]
    ListPilots,

    /// Hand control to the pilot with the given index.
    #[structopt(name = "select")]
    SelectPilot {
        /// Index of the pilot, as listed by `pilots`.
        index: usize,
    },

    /// Hand control to the pilot with the given name.
    #[structopt(name = "select-name")]
    SelectPilotByName {
        /// Name of the pilot, as listed by `pilots`. Quote names containing spaces.
        name: String,
    },

    /// Toggle frame recording on or off.
    #[structopt(name = "record")]
    ToggleRecord,

    /// Explicitly enable or disable frame recording.
    #[structopt(name = "set-record")]
    SetRecord {
        /// Enable recording, recording is disabled if omitted.
        #[structopt(long)]
        enabled: bool,
    },

    /// Stop the drive loop, leaving the actuators in neutral.
    #[structopt(name = "stop")]
    Stop,
}

/// Response to a [`RemoteCmd`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoteResponse {
    /// The command was executed.
    Ok,

    /// Status of the drive loop.
    Status(LoopStatus),

    /// Names of the available pilots.
    Pilots(Vec<String>),

    /// The command was rejected, with the reason.
    Invalid(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RemoteCmd {
    /// Parse a command from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cmd_json_format() {
        assert_eq!(
            serde_json::to_string(&RemoteCmd::SelectPilot { index: 3 }).unwrap(),
            r#"{"SelectPilot":{"index":3}}"#
        );
        assert_eq!(
            RemoteCmd::from_json(r#""ToggleRecord""#).unwrap(),
            RemoteCmd::ToggleRecord
        );
        assert!(RemoteCmd::from_json(r#"{"SelectPilot":{}}"#).is_err());
    }

    #[test]
    fn test_cmd_from_cli_words() {
        let cmd = RemoteCmd::from_iter_safe(vec!["remote", "select", "2"]).unwrap();
        assert_eq!(cmd, RemoteCmd::SelectPilot { index: 2 });

        let cmd = RemoteCmd::from_iter_safe(vec!["remote", "set-record", "--enabled"]).unwrap();
        assert_eq!(cmd, RemoteCmd::SetRecord { enabled: true });

        assert!(RemoteCmd::from_iter_safe(vec!["remote", "select", "two"]).is_err());
    }
}
