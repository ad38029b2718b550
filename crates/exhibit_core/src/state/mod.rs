//! Step state machine and per-run processing state.
//!
//! A run owns an ordered list of [`Step`]s. Each step moves
//! pending -> running -> complete | error exactly once; the aggregate
//! [`ProcessingState`] only accepts step mutations while the run is running
//! and attaches the result in the same write that marks it complete.

mod errors;
mod processing;
mod step;

pub use errors::{StateError, StateResult};
pub use processing::ProcessingState;
pub use step::Step;
