// src/exec/mod.rs

//! Work execution layer.
//!
//! - [`work_runner`] executes one work: read inputs, apply the shaper,
//!   write the output table.
//! - [`pool`] runs works on a bounded set of worker slots and reports back
//!   to the runtime via `RuntimeEvent`s.
//! - [`backend`] provides the `ExecutorBackend` trait the runtime talks to,
//!   which tests can replace with a fake implementation.

pub mod backend;
pub mod pool;
pub mod work_runner;

pub use backend::ExecutorBackend;
pub use pool::{WorkerPool, default_workers};
pub use work_runner::WorkRunner;
