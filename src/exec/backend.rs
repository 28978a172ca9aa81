// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a concrete pool.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production executor in [`super::pool`].
//!
//! Every backend reports back through the runtime event channel:
//! `WorkStarted` when a work is picked up, then exactly one of
//! `WorkCompleted` or `WorkDiscarded`.

use std::future::Future;
use std::pin::Pin;

use crate::dag::ScheduledWork;
use crate::errors::Result;

/// Trait abstracting how scheduled works are executed.
pub trait ExecutorBackend: Send {
    /// Queue the given works for execution.
    fn spawn_ready_works(
        &mut self,
        works: Vec<ScheduledWork>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Discard queued works that have not started. Running works continue.
    fn stop_queued(&mut self);

    /// Wait for everything already started and release all workers.
    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
