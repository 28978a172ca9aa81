// src/lib.rs

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod shaper;
pub mod table;
pub mod types;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::artifacts::RunOutput;
use crate::cli::CliArgs;
use crate::config::{PipelineFile, load_and_validate};
use crate::dag::DependencyGraph;
use crate::pipeline::{Pipeline, RunOptions};

pub use crate::errors::{PipelineError, Result as PipelineResult};
pub use crate::pipeline::run as run_pipeline;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline file loading
/// - graph preparation for the requested targets
/// - the run itself, aborted (with artifact cleanup) on Ctrl-C
/// - persisting and printing target outputs
pub async fn run(args: CliArgs) -> Result<()> {
    let file = load_and_validate(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let targets: BTreeSet<String> = args.targets.iter().cloned().collect();

    let pipeline = Pipeline::default();
    let graph = pipeline.prepare(&file.specs, &targets)?;

    if args.dry_run {
        print_dry_run(&file, &graph);
        return Ok(());
    }

    let mut options = RunOptions::from_pool(&file.pool);
    if let Some(workers) = args.workers {
        options.workers = usize::from(workers);
    }
    options.source = args.input.clone();

    let output = tokio::select! {
        res = pipeline.run(&file.specs, &targets, options) => res?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for Ctrl+C");
            }
            anyhow::bail!("interrupted; run aborted");
        }
    };

    report(&output, &targets, args.out_dir.as_deref())?;
    output.close()?;
    Ok(())
}

/// Print `id<TAB>path` for each target, persisting into `out_dir` first
/// when one was given.
fn report(output: &RunOutput, targets: &BTreeSet<String>, out_dir: Option<&Path>) -> Result<()> {
    for id in targets {
        let path = match out_dir {
            Some(dir) => output.persist(id, &dir.join(format!("{id}.tsv")))?,
            None => match output.path(id) {
                Some(path) => path.to_path_buf(),
                None => continue,
            },
        };
        println!("{id}\t{}", path.display());
    }
    info!(targets = targets.len(), "pipeline finished");
    Ok(())
}

/// Dry-run output: the steps that would run, in execution order.
fn print_dry_run(file: &PipelineFile, graph: &DependencyGraph) {
    println!("shaperdag dry-run");
    match file.pool.workers {
        Some(n) => println!("  pool.workers = {n}"),
        None => println!("  pool.workers = {} (default)", exec::default_workers()),
    }
    if let Some(dir) = &file.pool.artifact_dir {
        println!("  pool.artifact_dir = {}", dir.display());
    }
    println!();

    println!("steps ({} of {}):", graph.len(), file.specs.len());
    for id in graph.topological_order() {
        let Some(spec) = graph.spec(id) else {
            continue;
        };
        println!("  - {id}");
        println!("      type: {}", spec.kind);
        if !spec.dependencies.is_empty() {
            println!("      after: {:?}", spec.dependencies);
        }
    }

    debug!("dry-run complete (no execution)");
}
