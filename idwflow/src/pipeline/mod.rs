//! The pipeline orchestrator.
//!
//! [`Pipeline::run`] is the single entry point: it validates the raw `k`,
//! then runs the five stages strictly in order and stops at the first
//! failure.

mod orchestrator;
mod state;


pub use orchestrator::Pipeline;
pub use state::RunTracker;
