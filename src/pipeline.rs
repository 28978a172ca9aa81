// src/pipeline.rs

//! Top-level entry point: validate specs, run the filtered graph, return
//! every output path or the first failure.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::artifacts::{RunOutput, TempArtifacts};
use crate::config::PoolSection;
use crate::dag::{DependencyGraph, Scheduler, WorkSpec};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::errors::Result;
use crate::exec::{ExecutorBackend, WorkRunner, WorkerPool, default_workers};
use crate::shaper::ShaperRegistry;
use crate::table::{Storage, TsvStorage};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker slots (at least one is always used).
    pub workers: usize,
    /// Table fed to every work without dependencies.
    pub source: Option<PathBuf>,
    /// Parent for the run's artifact directory; system temp dir if `None`.
    pub artifact_dir: Option<PathBuf>,
    /// Fail a work that runs longer than this.
    pub work_timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            source: None,
            artifact_dir: None,
            work_timeout: None,
        }
    }
}

impl RunOptions {
    /// Options seeded from a pipeline file's `[pool]` section.
    pub fn from_pool(pool: &PoolSection) -> Self {
        Self {
            workers: pool.workers.unwrap_or_else(default_workers),
            artifact_dir: pool.artifact_dir.clone(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    fn artifacts(&self) -> Result<TempArtifacts> {
        match &self.artifact_dir {
            Some(dir) => TempArtifacts::new_in(dir),
            None => TempArtifacts::new(),
        }
    }
}

/// A shaper registry and a storage backend; each call to
/// [`Pipeline::run`] is an independent run with its own pool and artifacts.
#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<ShaperRegistry>,
    storage: Arc<dyn Storage>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("kinds", &self.registry.kinds().collect::<Vec<_>>())
            .field("storage", &self.storage)
            .finish()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ShaperRegistry::builtin(), Arc::new(TsvStorage))
    }
}

impl Pipeline {
    pub fn new(registry: ShaperRegistry, storage: Arc<dyn Storage>) -> Self {
        Self {
            registry: Arc::new(registry),
            storage,
        }
    }

    /// Everything that can fail before a work starts: references, cycles,
    /// targets, kinds and params. No side effects.
    pub fn prepare(
        &self,
        specs: &BTreeMap<String, WorkSpec>,
        targets: &BTreeSet<String>,
    ) -> Result<DependencyGraph> {
        let graph = DependencyGraph::build(specs)?;
        let filtered = graph.filter_to_targets(targets)?;
        filtered.validate_kinds(&self.registry)?;
        Ok(filtered)
    }

    /// Prepare and run with the production worker pool.
    pub async fn run(
        &self,
        specs: &BTreeMap<String, WorkSpec>,
        targets: &BTreeSet<String>,
        options: RunOptions,
    ) -> Result<RunOutput> {
        let graph = self.prepare(specs, targets)?;
        let runner = WorkRunner::new(Arc::clone(&self.registry), Arc::clone(&self.storage));
        let workers = options.workers;
        let timeout = options.work_timeout;

        execute_graph(graph, options, move |events| {
            WorkerPool::new(workers, runner, events).with_work_timeout(timeout)
        })
        .await
    }
}

/// Run an already prepared graph on the executor built by `make_executor`.
///
/// The executor receives the sending half of the completion channel.
pub async fn execute_graph<E, F>(
    graph: DependencyGraph,
    options: RunOptions,
    make_executor: F,
) -> Result<RunOutput>
where
    E: ExecutorBackend,
    F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
{
    let artifacts = options.artifacts()?;
    info!(
        works = graph.len(),
        workers = options.workers,
        artifacts = %artifacts.root().display(),
        "starting pipeline run"
    );

    let scheduler = Scheduler::new(graph, artifacts, options.source);
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(EVENT_CHANNEL_CAPACITY);
    let executor = make_executor(tx);

    let runtime = Runtime::new(CoreRuntime::new(scheduler), rx, executor);
    runtime.run().await
}

/// Run `specs` for `targets` with the built-in shapers and TSV storage.
pub async fn run(
    specs: &BTreeMap<String, WorkSpec>,
    targets: &BTreeSet<String>,
    options: RunOptions,
) -> Result<RunOutput> {
    Pipeline::default().run(specs, targets, options).await
}
