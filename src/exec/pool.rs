// src/exec/pool.rs

//! Bounded worker pool.
//!
//! Each dispatched work gets a Tokio task that first waits for one of `N`
//! semaphore permits and then runs the work on the blocking thread pool.
//! The permit is held until the completion has been posted, so at most `N`
//! works are ever reported as running at once.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::dag::ScheduledWork;
use crate::engine::{RuntimeEvent, WorkOutcome};
use crate::errors::{PipelineError, Result};
use crate::exec::ExecutorBackend;
use crate::exec::work_runner::WorkRunner;

/// One less than the number of logical CPUs, and at least one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Production executor: runs works through a [`WorkRunner`] with bounded
/// concurrency and reports to the runtime over `events`.
#[derive(Debug)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    runner: WorkRunner,
    events: mpsc::Sender<RuntimeEvent>,
    tasks: JoinSet<()>,
    work_timeout: Option<Duration>,
}

impl WorkerPool {
    pub fn new(workers: usize, runner: WorkRunner, events: mpsc::Sender<RuntimeEvent>) -> Self {
        let workers = workers.max(1);
        info!(workers, "worker pool created");
        Self {
            semaphore: Arc::new(Semaphore::new(workers)),
            runner,
            events,
            tasks: JoinSet::new(),
            work_timeout: None,
        }
    }

    /// Report a work as failed once it has run longer than `limit`.
    ///
    /// The blocking thread cannot be interrupted, so the worker slot stays
    /// occupied until the shaper actually returns.
    pub fn with_work_timeout(mut self, limit: Option<Duration>) -> Self {
        self.work_timeout = limit;
        self
    }
}

impl ExecutorBackend for WorkerPool {
    fn spawn_ready_works(
        &mut self,
        works: Vec<ScheduledWork>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for work in works {
                debug!(work = %work.id, "queued for worker slot");
                self.tasks.spawn(run_one(
                    work,
                    self.runner.clone(),
                    Arc::clone(&self.semaphore),
                    self.events.clone(),
                    self.work_timeout,
                ));
            }
            Ok(())
        })
    }

    fn stop_queued(&mut self) {
        info!("worker pool: discarding queued works");
        self.semaphore.close();
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.semaphore.close();

            let mut failures = Vec::new();
            while let Some(joined) = self.tasks.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "worker task did not exit cleanly");
                    failures.push(e.to_string());
                }
            }

            if failures.is_empty() {
                debug!("worker pool shut down");
                Ok(())
            } else {
                Err(PipelineError::PoolShutdown(failures.join("; ")))
            }
        })
    }
}

/// Lifecycle of one dispatched work inside the pool.
async fn run_one(
    work: ScheduledWork,
    runner: WorkRunner,
    semaphore: Arc<Semaphore>,
    events: mpsc::Sender<RuntimeEvent>,
    work_timeout: Option<Duration>,
) {
    let id = work.id.clone();

    let Ok(permit) = semaphore.clone().acquire_owned().await else {
        debug!(work = %id, "pool stopped before work started; discarding");
        let _ = events.send(RuntimeEvent::WorkDiscarded { id }).await;
        return;
    };

    if events
        .send(RuntimeEvent::WorkStarted { id: id.clone() })
        .await
        .is_err()
    {
        return;
    }

    let mut handle = tokio::task::spawn_blocking(move || runner.execute(&work));

    let joined = match work_timeout {
        None => (&mut handle).await,
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(work = %id, ?limit, "work exceeded its time limit");
                semaphore.close();
                let _ = events
                    .send(RuntimeEvent::WorkCompleted {
                        id: id.clone(),
                        outcome: WorkOutcome::Failed(format!(
                            "timed out after {}s",
                            limit.as_secs_f64()
                        )),
                    })
                    .await;
                // Keep the slot until the thread is really done.
                let _ = handle.await;
                drop(permit);
                return;
            }
        },
    };

    let outcome = match joined {
        Ok(Ok(path)) => {
            debug!(work = %id, output = %path.display(), "work succeeded");
            WorkOutcome::Success
        }
        Ok(Err(e)) => {
            let cause = format!("{e:#}");
            warn!(work = %id, %cause, "work failed");
            WorkOutcome::Failed(cause)
        }
        Err(e) => {
            error!(work = %id, error = %e, "worker panicked");
            WorkOutcome::Failed(join_error_message(e))
        }
    };

    // Close the queue before the slot is freed, so no waiting work can
    // take it between this failure and the runtime's stop command.
    if matches!(outcome, WorkOutcome::Failed(_)) {
        semaphore.close();
    }
    let _ = events.send(RuntimeEvent::WorkCompleted { id, outcome }).await;
    drop(permit);
}

fn join_error_message(e: JoinError) -> String {
    if e.is_panic() {
        format!("shaper panicked: {}", panic_message(e.into_panic()))
    } else {
        e.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
