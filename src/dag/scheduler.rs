// src/dag/scheduler.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::artifacts::{RunOutput, TempArtifacts};
use crate::dag::graph::DependencyGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::dag::work::{ScheduledWork, Work, WorkStatus};
use crate::engine::{WorkId, WorkOutcome};
use crate::errors::{PipelineError, Result};

/// The first failure of a run and everything it cut off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub id: WorkId,
    pub cause: String,
    pub blocked: Vec<WorkId>,
}

/// Scheduler holds the filtered graph plus the mutable state of one run.
///
/// It is responsible for:
/// - promoting works to Ready once every dependency has Completed
/// - reserving output paths and assembling inputs for Ready works
/// - recording results and the first failure
/// - deciding when the run is over
///
/// It is fed one event at a time, so "complete, release dependents, promote"
/// is a single step and a work can never be dispatched twice.
#[derive(Debug)]
pub struct Scheduler {
    graph: DependencyGraph,
    works: BTreeMap<WorkId, Work>,
    artifacts: TempArtifacts,
    /// Table fed to works without dependencies.
    source: Option<PathBuf>,
    results: BTreeMap<WorkId, PathBuf>,
    /// Dispatched works that have not reported a terminal event yet.
    in_flight: BTreeSet<WorkId>,
    failure: Option<FailureRecord>,
    started: bool,
}

impl Scheduler {
    pub fn new(graph: DependencyGraph, artifacts: TempArtifacts, source: Option<PathBuf>) -> Self {
        let works = graph
            .specs()
            .map(|spec| (spec.id.clone(), Work::from_spec(spec)))
            .collect();

        Self {
            graph,
            works,
            artifacts,
            source,
            results: BTreeMap::new(),
            in_flight: BTreeSet::new(),
            failure: None,
            started: false,
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Current status of a work, or `None` if it is not part of this run.
    pub fn status_of(&self, id: &str) -> Option<WorkStatus> {
        self.works.get(id).map(|w| w.status)
    }

    pub fn work(&self, id: &str) -> Option<&Work> {
        self.works.get(id)
    }

    /// Outputs of completed works so far.
    pub fn results(&self) -> &BTreeMap<WorkId, PathBuf> {
        &self.results
    }

    pub fn failure(&self) -> Option<&FailureRecord> {
        self.failure.as_ref()
    }

    /// Number of dispatched works that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether the run is over: every work completed, or a failure was
    /// recorded and nothing dispatched is still outstanding.
    pub fn is_finished(&self) -> bool {
        if !self.started {
            return false;
        }
        match self.failure {
            Some(_) => self.in_flight.is_empty(),
            None => self.works.values().all(|w| w.status == WorkStatus::Completed),
        }
    }

    /// Promote every work without dependencies (production API).
    pub fn start(&mut self) -> Vec<ScheduledWork> {
        self.start_step_internal().newly_ready
    }

    /// Manual-step variant of `start`.
    pub fn step_start(&mut self) -> SchedulerStep {
        self.start_step_internal()
    }

    /// Record that a worker picked up `id`. Only valid from Ready.
    pub fn mark_started(&mut self, id: &str) -> bool {
        match self.works.get_mut(id) {
            Some(work) if work.status == WorkStatus::Ready => {
                work.status = WorkStatus::Running;
                debug!(work = %id, "work Running");
                true
            }
            Some(work) => {
                warn!(work = %id, status = ?work.status, "start for work not Ready; ignoring");
                false
            }
            None => {
                warn!(work = %id, "start for unknown work; ignoring");
                false
            }
        }
    }

    /// Handle the outcome of a running work (production API).
    pub fn handle_completion(&mut self, id: &str, outcome: WorkOutcome) -> Vec<ScheduledWork> {
        self.completion_step_internal(id, outcome).newly_ready
    }

    /// Manual-step variant of `handle_completion`.
    pub fn step_completion(&mut self, id: &str, outcome: WorkOutcome) -> SchedulerStep {
        self.completion_step_internal(id, outcome)
    }

    /// A Ready work was dropped by the executor without running. This only
    /// happens after a failure stopped the queue.
    pub fn mark_discarded(&mut self, id: &str) -> bool {
        if !self.in_flight.remove(id) {
            warn!(work = %id, "discard for work not in flight; ignoring");
            return false;
        }
        debug!(work = %id, "queued work discarded");
        self.maybe_finish_run()
    }

    /// Consume the scheduler and produce the run's outcome.
    ///
    /// On failure the artifacts are dropped here, so nothing is left on
    /// disk by the time the error reaches the caller.
    pub fn finish(self) -> Result<RunOutput> {
        if let Some(failure) = self.failure {
            return Err(PipelineError::Execution {
                id: failure.id,
                cause: failure.cause,
                blocked: failure.blocked,
            });
        }

        let unfinished: Vec<&str> = self
            .works
            .values()
            .filter(|w| w.status != WorkStatus::Completed)
            .map(Work::id)
            .collect();
        if !unfinished.is_empty() {
            return Err(PipelineError::PoolShutdown(format!(
                "run ended before works finished: {}",
                unfinished.join(", ")
            )));
        }

        Ok(RunOutput::new(self.results, self.artifacts))
    }

    fn maybe_finish_run(&self) -> bool {
        let finished = self.is_finished();
        if finished {
            info!(
                completed = self.results.len(),
                failed = self.failure.is_some(),
                "scheduler: run finished"
            );
        }
        finished
    }

    fn start_step_internal(&mut self) -> SchedulerStep {
        if self.started {
            warn!("scheduler already started; ignoring");
            return SchedulerStep::default();
        }
        self.started = true;

        let mut manager = StateManager::new(&self.graph, &mut self.works);
        let roots = manager.roots();
        let newly_ready =
            manager.promote_to_ready(roots, &self.results, self.source.as_ref(), &mut self.artifacts);
        self.in_flight.extend(newly_ready.iter().map(|w| w.id.clone()));

        info!(
            works = self.works.len(),
            roots = newly_ready.len(),
            "scheduler: run started"
        );

        SchedulerStep {
            newly_ready,
            run_just_finished: self.maybe_finish_run(),
            ..SchedulerStep::default()
        }
    }

    fn completion_step_internal(&mut self, id: &str, outcome: WorkOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(work) = self.works.get_mut(id) else {
            warn!(work = %id, "completion for unknown work; ignoring");
            return step;
        };
        if work.status != WorkStatus::Running {
            warn!(work = %id, status = ?work.status, "completion for work not Running; ignoring");
            return step;
        }
        self.in_flight.remove(id);

        match outcome {
            WorkOutcome::Success => {
                work.status = WorkStatus::Completed;
                if let Some(output) = work.output_path.clone() {
                    self.results.insert(id.to_string(), output);
                }
                info!(work = %id, "work completed");

                if self.failure.is_none() {
                    let mut manager = StateManager::new(&self.graph, &mut self.works);
                    let unlocked = manager.release_dependents(id);
                    step.newly_ready = manager.promote_to_ready(
                        unlocked,
                        &self.results,
                        self.source.as_ref(),
                        &mut self.artifacts,
                    );
                    self.in_flight
                        .extend(step.newly_ready.iter().map(|w| w.id.clone()));
                }
            }
            WorkOutcome::Failed(cause) => {
                work.status = WorkStatus::Failed;
                work.error = Some(cause.clone());
                step.newly_failed.push(id.to_string());

                if self.failure.is_none() {
                    let manager = StateManager::new(&self.graph, &mut self.works);
                    let blocked = manager.collect_blocked(id);
                    warn!(
                        work = %id,
                        %cause,
                        ?blocked,
                        "work failed; no further works will be dispatched"
                    );
                    step.newly_blocked = blocked.clone();
                    self.failure = Some(FailureRecord {
                        id: id.to_string(),
                        cause,
                        blocked,
                    });
                } else {
                    warn!(work = %id, %cause, "work failed after an earlier failure");
                }
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }
}
