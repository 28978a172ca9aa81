// src/exec/work_runner.rs

//! Runs one work: read inputs, apply the shaper, write the output.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::dag::ScheduledWork;
use crate::shaper::ShaperRegistry;
use crate::table::Storage;

/// Everything a worker needs to execute a [`ScheduledWork`].
///
/// Cheap to clone; each worker holds its own handle.
#[derive(Debug, Clone)]
pub struct WorkRunner {
    registry: Arc<ShaperRegistry>,
    storage: Arc<dyn Storage>,
}

impl WorkRunner {
    pub fn new(registry: Arc<ShaperRegistry>, storage: Arc<dyn Storage>) -> Self {
        Self { registry, storage }
    }

    /// Execute the work and return its output path.
    ///
    /// Every failure comes back as an error value attributed to this work.
    pub fn execute(&self, work: &ScheduledWork) -> Result<PathBuf> {
        info!(work = %work.id, kind = %work.kind, inputs = work.inputs.len(), "running shaper");

        let shaper = self
            .registry
            .instantiate(&work.kind, &work.params)
            .with_context(|| format!("building shaper '{}' for work '{}'", work.kind, work.id))?;

        let inputs = work
            .inputs
            .iter()
            .map(|path| {
                self.storage
                    .read_table(path)
                    .with_context(|| format!("reading input {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        let output = shaper
            .apply(inputs)
            .with_context(|| format!("applying '{}'", work.kind))?;
        debug!(work = %work.id, rows = output.len(), "shaper produced table");

        self.storage
            .write_table(&output, &work.output)
            .with_context(|| format!("writing output {}", work.output.display()))?;

        Ok(work.output.clone())
    }
}
