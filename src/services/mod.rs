//! Card operations
//!
//! The join state machine and the single-shot card operations, separated
//! from argument parsing and process concerns.

pub mod card_info;
pub mod join;
pub mod network;
pub mod pacing;
pub mod progress;
pub mod status;
