// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::artifacts::RunOutput;
use crate::dag::ScheduledWork;
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s and delegates the
/// actual work execution to an `ExecutorBackend`.
///
/// All run semantics live in `CoreRuntime`. This shell only moves events
/// from the channel into the core and commands from the core into the
/// executor. It is the single consumer of the completion channel, so the
/// core sees one event at a time.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Run to completion.
    ///
    /// Whatever happens in the loop, the executor is shut down before the
    /// core produces its result, and the event channel is closed before
    /// that so no worker can block on a full channel.
    pub async fn run(self) -> Result<RunOutput> {
        let Runtime {
            mut core,
            mut event_rx,
            mut executor,
        } = self;

        info!("shaperdag runtime started");
        let loop_result = drive(&mut core, &mut event_rx, &mut executor).await;

        drop(event_rx);
        let shutdown_result = executor.shutdown().await;
        let outcome = core.finish();
        info!("runtime exiting");

        loop_result?;
        shutdown_result?;
        outcome
    }
}

/// Main event loop.
///
/// - Seeds the run from the core.
/// - Consumes `RuntimeEvent`s until the core says the run is over.
/// - Executes commands returned by the core.
async fn drive<E: ExecutorBackend>(
    core: &mut CoreRuntime,
    event_rx: &mut mpsc::Receiver<RuntimeEvent>,
    executor: &mut E,
) -> Result<()> {
    let mut step = core.start();

    loop {
        let keep_running = step.keep_running;
        execute_commands(executor, step).await?;

        if !keep_running {
            debug!("core reports run finished; stopping runtime");
            return Ok(());
        }

        let event = match event_rx.recv().await {
            Some(e) => e,
            None => {
                warn!("runtime event channel closed before run finished");
                return Ok(());
            }
        };

        debug!(?event, "runtime received event");
        step = core.step(event);
    }
}

async fn execute_commands<E: ExecutorBackend>(executor: &mut E, step: CoreStep) -> Result<()> {
    for command in step.commands {
        match command {
            CoreCommand::DispatchWorks(works) => spawn_ready(executor, works).await?,
            CoreCommand::StopQueued => executor.stop_queued(),
        }
    }
    Ok(())
}

async fn spawn_ready<E: ExecutorBackend>(executor: &mut E, works: Vec<ScheduledWork>) -> Result<()> {
    if works.is_empty() {
        return Ok(());
    }

    let ids: Vec<_> = works.iter().map(|w| w.id.as_str()).collect();
    debug!(?ids, "dispatching ready works");

    executor.spawn_ready_works(works).await
}
