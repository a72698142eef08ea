//! # Communications interface crate.
//!
//! Provides the network plumbing and the message definitions shared between the drive executable
//! and the operator's remote control tools.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Network module
pub mod net;

/// Remote control commands and responses
pub mod remote;
