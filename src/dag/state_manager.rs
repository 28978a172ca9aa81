// src/dag/state_manager.rs

//! Per-run state transitions for works in the scheduler.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::artifacts::TempArtifacts;
use crate::dag::DependencyGraph;
use crate::dag::work::{ScheduledWork, Work, WorkStatus};
use crate::engine::WorkId;

/// Manages dependency bookkeeping and Ready promotion for one run.
pub struct StateManager<'a> {
    graph: &'a DependencyGraph,
    works: &'a mut BTreeMap<WorkId, Work>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a DependencyGraph, works: &'a mut BTreeMap<WorkId, Work>) -> Self {
        Self { graph, works }
    }

    /// Works that start with no unresolved dependency.
    pub fn roots(&self) -> Vec<WorkId> {
        self.works
            .values()
            .filter(|w| w.status == WorkStatus::Pending && w.remaining_deps.is_empty())
            .map(|w| w.spec.id.clone())
            .collect()
    }

    /// Remove `completed` from the remaining dependencies of its direct
    /// dependents. Returns the dependents that have nothing left to wait for.
    pub fn release_dependents(&mut self, completed: &str) -> Vec<WorkId> {
        let mut unlocked = Vec::new();

        for dependent in self.graph.dependents_of(completed) {
            let Some(work) = self.works.get_mut(dependent) else {
                warn!(work = %dependent, "dependent missing from works map");
                continue;
            };

            if !work.remaining_deps.remove(completed) {
                continue;
            }
            debug!(
                work = %dependent,
                dependency = %completed,
                remaining = work.remaining_deps.len(),
                "dependency resolved"
            );

            if work.remaining_deps.is_empty() && work.status == WorkStatus::Pending {
                unlocked.push(dependent.clone());
            }
        }

        unlocked
    }

    /// Move the given Pending works to Ready: gather their inputs, reserve
    /// an output path and build the dispatch descriptors.
    ///
    /// Roots read `source` when one is configured; everyone else reads the
    /// outputs of its dependencies in declaration order.
    pub fn promote_to_ready(
        &mut self,
        ids: Vec<WorkId>,
        results: &BTreeMap<WorkId, PathBuf>,
        source: Option<&PathBuf>,
        artifacts: &mut TempArtifacts,
    ) -> Vec<ScheduledWork> {
        let mut ready = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(work) = self.works.get_mut(&id) else {
                warn!(work = %id, "cannot promote unknown work");
                continue;
            };
            if work.status != WorkStatus::Pending || !work.remaining_deps.is_empty() {
                warn!(work = %id, status = ?work.status, "work not eligible for Ready; skipping");
                continue;
            }

            let inputs: Option<Vec<PathBuf>> = if work.spec.dependencies.is_empty() {
                Some(source.into_iter().cloned().collect())
            } else {
                work.spec
                    .dependencies
                    .iter()
                    .map(|dep| results.get(dep).cloned())
                    .collect()
            };
            let Some(inputs) = inputs else {
                warn!(work = %id, "dependency output missing; leaving work Pending");
                continue;
            };

            let output = artifacts.allocate(&id);
            work.input_paths = inputs;
            work.output_path = Some(output.clone());
            work.status = WorkStatus::Ready;

            info!(work = %id, kind = %work.spec.kind, "dependencies satisfied; work Ready");
            ready.push(ScheduledWork::from_work(work, output));
        }

        ready
    }

    /// Pending works that can never run because they transitively depend on
    /// `failed`. Sorted by id.
    pub fn collect_blocked(&self, failed: &str) -> Vec<WorkId> {
        let mut stack: Vec<&str> = self
            .graph
            .dependents_of(failed)
            .iter()
            .map(String::as_str)
            .collect();
        let mut blocked = BTreeSet::new();

        while let Some(id) = stack.pop() {
            let pending = self
                .works
                .get(id)
                .is_some_and(|w| w.status == WorkStatus::Pending);
            if pending && blocked.insert(id.to_string()) {
                stack.extend(self.graph.dependents_of(id).iter().map(String::as_str));
            }
        }

        blocked.into_iter().collect()
    }

    pub fn all_completed(&self) -> bool {
        self.works
            .values()
            .all(|w| w.status == WorkStatus::Completed)
    }
}
