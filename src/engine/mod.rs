// src/engine/mod.rs

//! Orchestration engine for shaperdag.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the runtime event loop that reacts to:
//!   - works being picked up by a worker
//!   - work completion events
//!   - queued works being discarded after a failure
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

/// Canonical work id type used throughout the engine.
pub type WorkId = String;

/// Outcome of one work execution, as reported by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    Success,
    /// The work failed; the payload is a human-readable cause.
    Failed(String),
}

/// Events flowing into the runtime from the executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A worker slot picked up the work and is about to run it.
    WorkStarted { id: WorkId },
    /// The work finished, successfully or not.
    WorkCompleted { id: WorkId, outcome: WorkOutcome },
    /// The work was dropped from the queue without running.
    WorkDiscarded { id: WorkId },
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
