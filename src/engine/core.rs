// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for reading
//! events from the channel and forwarding commands to the executor.
//!
//! The core is unit tested without any Tokio, channels or worker threads.

use crate::artifacts::RunOutput;
use crate::dag::Scheduler;
use crate::engine::RuntimeEvent;
use crate::engine::event_handlers::{
    CoreStep, handle_run_start, handle_work_completion, handle_work_discarded,
    handle_work_started,
};
use crate::errors::Result;

/// Pure core runtime state.
///
/// Owns the scheduler and remembers whether the executor was already told
/// to stop. Has **no** channels, no Tokio types, and performs no IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    stop_issued: bool,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            stop_issued: false,
        }
    }

    /// Read-only access for tests and diagnostics.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    /// Produce the initial dispatch.
    pub fn start(&mut self) -> CoreStep {
        handle_run_start(&mut self.scheduler)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::WorkStarted { id } => handle_work_started(&mut self.scheduler, id),
            RuntimeEvent::WorkCompleted { id, outcome } => {
                handle_work_completion(&mut self.scheduler, &mut self.stop_issued, id, outcome)
            }
            RuntimeEvent::WorkDiscarded { id } => handle_work_discarded(&mut self.scheduler, id),
        }
    }

    /// Consume the core and produce the run's result.
    pub fn finish(self) -> Result<RunOutput> {
        self.scheduler.finish()
    }
}
