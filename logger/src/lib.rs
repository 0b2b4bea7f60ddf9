#![warn(missing_docs)]

//! Interactive logger for the Logic socket service.
//!
//! A session discovers the active device, applies the operator's channel, sample rate, trigger
//! and capture duration choices, then captures back to back and exports every analyzer to a
//! timestamped CSV file after each capture, until the operator presses Escape.

pub mod operator;
pub mod output;
pub mod workflow;

pub use workflow::{run, Outcome, Settings, WorkflowError};
