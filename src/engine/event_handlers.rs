// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info};

use crate::dag::{ScheduledWork, Scheduler};
use crate::engine::{WorkId, WorkOutcome};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these works to the executor.
    DispatchWorks(Vec<ScheduledWork>),
    /// Drop queued works that have not started; let running ones finish.
    StopQueued,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn from_scheduler(scheduler: &Scheduler, commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: !scheduler.is_finished(),
        }
    }
}

/// Seed the run with every work that has no dependencies.
pub fn handle_run_start(scheduler: &mut Scheduler) -> CoreStep {
    let mut commands = Vec::new();

    let ready = scheduler.start();
    if !ready.is_empty() {
        commands.push(CoreCommand::DispatchWorks(ready));
    }

    CoreStep::from_scheduler(scheduler, commands)
}

/// A worker picked up `id`.
pub fn handle_work_started(scheduler: &mut Scheduler, id: WorkId) -> CoreStep {
    scheduler.mark_started(&id);
    CoreStep::from_scheduler(scheduler, Vec::new())
}

/// A work finished.
///
/// The first failure also tells the executor to stop handing out queued
/// works; `stop_issued` makes sure that happens once.
pub fn handle_work_completion(
    scheduler: &mut Scheduler,
    stop_issued: &mut bool,
    id: WorkId,
    outcome: WorkOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let newly_ready = scheduler.handle_completion(&id, outcome);
    if !newly_ready.is_empty() {
        commands.push(CoreCommand::DispatchWorks(newly_ready));
    }

    if scheduler.failure().is_some() && !*stop_issued {
        info!(work = %id, "failure recorded; stopping queued works");
        *stop_issued = true;
        commands.push(CoreCommand::StopQueued);
    }

    CoreStep::from_scheduler(scheduler, commands)
}

/// A queued work was dropped by the executor.
pub fn handle_work_discarded(scheduler: &mut Scheduler, id: WorkId) -> CoreStep {
    debug!(work = %id, "executor discarded queued work");
    scheduler.mark_discarded(&id);
    CoreStep::from_scheduler(scheduler, Vec::new())
}
