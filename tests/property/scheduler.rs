use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use shaperdag::artifacts::TempArtifacts;
use shaperdag::dag::{DependencyGraph, Scheduler, WorkSpec, WorkStatus};
use shaperdag::engine::WorkOutcome;
use shaperdag::errors::PipelineError;
use shaperdag_test_utils::builders::{SpecsBuilder, WorkSpecBuilder};

// Strategy to generate a valid spec set.
// We ensure acyclicity by only allowing work N to depend on works 0..N-1.
fn dag_strategy(max_works: usize) -> impl Strategy<Value = BTreeMap<String, WorkSpec>> {
    (1..=max_works).prop_flat_map(|num_works| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_works),
            num_works,
        );

        deps_strat.prop_map(move |raw_deps| {
            let mut builder = SpecsBuilder::new();
            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let mut spec = WorkSpecBuilder::new(&format!("w{i:02}"), "noop");

                // Only allow deps < i.
                let valid: BTreeSet<usize> = if i == 0 {
                    BTreeSet::new()
                } else {
                    potential_deps.into_iter().map(|d| d % i).collect()
                };
                for dep in valid {
                    spec = spec.after(&format!("w{dep:02}"));
                }
                builder = builder.with_spec(spec.build());
            }
            builder.build()
        })
    })
}

/// Every id that transitively depends on `root`.
fn downstream(graph: &DependencyGraph, root: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<String> = graph.dependents_of(root).to_vec();
    while let Some(id) = stack.pop() {
        if seen.insert(id.clone()) {
            stack.extend(graph.dependents_of(&id).iter().cloned());
        }
    }
    seen
}

struct Simulation {
    scheduler: Scheduler,
    running: Vec<String>,
    dispatched: BTreeSet<String>,
}

impl Simulation {
    fn new(specs: &BTreeMap<String, WorkSpec>) -> Self {
        let graph = DependencyGraph::build(specs).unwrap();
        let scheduler = Scheduler::new(graph, TempArtifacts::new().unwrap(), None);
        Self {
            scheduler,
            running: Vec::new(),
            dispatched: BTreeSet::new(),
        }
    }

    /// Check and start freshly dispatched works.
    fn accept(&mut self, ids: Vec<String>) -> Result<(), TestCaseError> {
        for id in ids {
            prop_assert!(self.dispatched.insert(id.clone()), "{id} dispatched twice");
            for dep in self.scheduler.graph().dependencies_of(&id) {
                prop_assert_eq!(
                    self.scheduler.status_of(dep),
                    Some(WorkStatus::Completed),
                    "{} dispatched before {}", id, dep
                );
            }
            prop_assert!(self.scheduler.mark_started(&id));
            self.running.push(id);
        }
        Ok(())
    }
}

proptest! {
    #[test]
    fn works_only_run_after_all_dependencies_completed(
        specs in dag_strategy(12),
        picks in proptest::collection::vec(any::<usize>(), 0..64),
    ) {
        let mut sim = Simulation::new(&specs);
        let roots = sim.scheduler.start().into_iter().map(|w| w.id).collect();
        sim.accept(roots)?;

        let mut picks = picks.into_iter();
        while !sim.running.is_empty() {
            let pick = picks.next().unwrap_or(0) % sim.running.len();
            let id = sim.running.swap_remove(pick);

            let ready = sim.scheduler.handle_completion(&id, WorkOutcome::Success);
            sim.accept(ready.into_iter().map(|w| w.id).collect())?;
        }

        prop_assert!(sim.scheduler.is_finished());
        prop_assert_eq!(sim.dispatched.len(), specs.len());
        let output = sim.scheduler.finish().unwrap();
        prop_assert_eq!(
            output.paths().keys().cloned().collect::<BTreeSet<_>>(),
            specs.keys().cloned().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn dependents_of_the_first_failure_never_run(
        specs in dag_strategy(12),
        picks in proptest::collection::vec(any::<usize>(), 0..64),
        fail_at in any::<usize>(),
    ) {
        let mut sim = Simulation::new(&specs);
        let ids: Vec<String> = specs.keys().cloned().collect();
        let failing = ids[fail_at % ids.len()].clone();
        let cut_off = downstream(sim.scheduler.graph(), &failing);

        let roots = sim.scheduler.start().into_iter().map(|w| w.id).collect();
        sim.accept(roots)?;

        let mut picks = picks.into_iter();
        while !sim.running.is_empty() {
            let pick = picks.next().unwrap_or(0) % sim.running.len();
            let id = sim.running.swap_remove(pick);
            let outcome = if id == failing {
                WorkOutcome::Failed("injected".to_string())
            } else {
                WorkOutcome::Success
            };

            let ready = sim.scheduler.handle_completion(&id, outcome);
            sim.accept(ready.into_iter().map(|w| w.id).collect())?;
        }

        prop_assert!(sim.scheduler.is_finished());
        for id in &cut_off {
            prop_assert!(!sim.dispatched.contains(id), "{id} ran after its dependency failed");
        }

        match sim.scheduler.finish() {
            Err(PipelineError::Execution { id, blocked, .. }) => {
                prop_assert_eq!(id, failing);
                prop_assert_eq!(blocked.into_iter().collect::<BTreeSet<_>>(), cut_off);
            }
            other => prop_assert!(false, "expected Execution error, got {:?}", other),
        }
    }
}
