// src/dag/work.rs

//! Per-run work state and the dispatch descriptor handed to executors.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde_json::Value;

use crate::dag::WorkSpec;
use crate::engine::WorkId;

/// Lifecycle of a work within one run.
///
/// Transitions only move forward:
/// `Pending -> Ready -> Running -> Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// Waiting on at least one dependency.
    Pending,
    /// Output path allocated and handed to the executor, not started yet.
    Ready,
    /// Picked up by a worker.
    Running,
    Completed,
    Failed,
}

impl WorkStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkStatus::Completed | WorkStatus::Failed)
    }
}

/// Runtime instance of a [`WorkSpec`].
#[derive(Debug, Clone)]
pub struct Work {
    pub spec: WorkSpec,
    pub status: WorkStatus,
    /// Dependencies that have not completed yet. Owned per work; only ever
    /// shrinks.
    pub remaining_deps: BTreeSet<WorkId>,
    /// Predecessor outputs in declaration order, set on the move to Ready.
    pub input_paths: Vec<PathBuf>,
    /// Assigned exactly once, on the move to Ready.
    pub output_path: Option<PathBuf>,
    /// Failure cause, set only on Failed.
    pub error: Option<String>,
}

impl Work {
    pub fn from_spec(spec: &WorkSpec) -> Self {
        Self {
            remaining_deps: spec.dependencies.iter().cloned().collect(),
            spec: spec.clone(),
            status: WorkStatus::Pending,
            input_paths: Vec::new(),
            output_path: None,
            error: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }
}

/// A work the scheduler wants executed now.
#[derive(Debug, Clone)]
pub struct ScheduledWork {
    pub id: WorkId,
    pub kind: String,
    pub params: Value,
    /// Tables to read, in dependency declaration order.
    pub inputs: Vec<PathBuf>,
    /// Where the result table must be written.
    pub output: PathBuf,
}

impl ScheduledWork {
    /// Build the descriptor from a work that has just become Ready.
    pub fn from_work(work: &Work, output: PathBuf) -> Self {
        Self {
            id: work.spec.id.clone(),
            kind: work.spec.kind.clone(),
            params: work.spec.params.clone(),
            inputs: work.input_paths.clone(),
            output,
        }
    }
}
