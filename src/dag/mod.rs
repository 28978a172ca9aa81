// src/dag/mod.rs

//! Dependency graph and scheduling.
//!
//! - [`work_spec`] is the declarative description of one step.
//! - [`graph`] validates specs into an acyclic [`DependencyGraph`] and
//!   restricts it to a target set.
//! - [`work`] holds per-run work state and the dispatch descriptor.
//! - [`scheduler`] is the per-run state machine deciding which works are
//!   ready and what a completion unlocks.
//! - [`state_manager`] implements the individual state transitions.
//! - [`scheduler_step`] defines the result type for manual stepping.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod work;
pub mod work_spec;

pub use graph::DependencyGraph;
pub use scheduler::{FailureRecord, Scheduler};
pub use scheduler_step::SchedulerStep;
pub use work::{ScheduledWork, Work, WorkStatus};
pub use work_spec::WorkSpec;
