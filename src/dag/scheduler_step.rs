// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::work::ScheduledWork;
use crate::engine::WorkId;

/// Structured result of a single scheduler "step".
///
/// Useful for tests that drive the scheduler by hand and assert on what
/// changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Works that became Ready in this step and must be dispatched.
    pub newly_ready: Vec<ScheduledWork>,
    /// Works that were newly marked as Failed in this step.
    pub newly_failed: Vec<WorkId>,
    /// Works that can no longer run because of a failure in this step.
    pub newly_blocked: Vec<WorkId>,
    /// Whether this step finished the run.
    pub run_just_finished: bool,
}
