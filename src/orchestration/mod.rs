//! # Orchestration
//!
//! Invocation-level control: how much to attempt ([`chunk_planner`]) and the
//! state machine that runs one invocation end to end
//! ([`ContinuationController`]).

pub mod chunk_planner;
pub mod continuation_controller;

pub use chunk_planner::{plan, plan_chunk};
pub use continuation_controller::{ContinuationController, InvocationState};
