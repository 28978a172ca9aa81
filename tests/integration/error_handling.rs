// tests/integration/error_handling.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use shaperdag::errors::PipelineError;
use shaperdag::pipeline::{self, Pipeline, RunOptions};
use shaperdag::shaper::{Shaper, ShaperError, ShaperRegistry};
use shaperdag::table::{Table, TsvStorage};

use crate::common::builders::{SpecsBuilder, WorkSpecBuilder, targets};
use crate::common::{entries, init_tracing, with_timeout, write_stats};

#[derive(Debug)]
struct Explode;

fn build_explode(_params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
    Ok(Box::new(Explode))
}

impl Shaper for Explode {
    fn apply(&self, _inputs: Vec<Table>) -> Result<Table, ShaperError> {
        panic!("table exploded");
    }
}

static COUNTED_RUNS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Counted;

fn build_counted(_params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
    Ok(Box::new(Counted))
}

impl Shaper for Counted {
    fn apply(&self, mut inputs: Vec<Table>) -> Result<Table, ShaperError> {
        COUNTED_RUNS.fetch_add(1, Ordering::SeqCst);
        Ok(inputs.pop().unwrap_or_else(|| Table::new(["empty"])))
    }
}

fn select(columns: &[&str]) -> Value {
    json!({ "columns": columns })
}

#[tokio::test]
async fn cycle_fails_before_anything_is_created() {
    init_tracing();
    let scratch = tempfile::tempdir().unwrap();
    let specs = SpecsBuilder::new()
        .with_step("A", "columnSelector", &["C"])
        .with_step("B", "columnSelector", &["A"])
        .with_step("C", "columnSelector", &["B"])
        .build();

    let options = RunOptions {
        artifact_dir: Some(scratch.path().to_path_buf()),
        ..RunOptions::default()
    };
    let err = pipeline::run(&specs, &targets(&["C"]), options)
        .await
        .unwrap_err();

    match err {
        PipelineError::CyclicDependency { path } => {
            assert!(path.iter().any(|id| ["A", "B", "C"].contains(&id.as_str())));
        }
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
    assert_eq!(entries(scratch.path()), 0);
}

#[tokio::test]
async fn unknown_target_is_rejected() {
    let specs = SpecsBuilder::new()
        .with_spec(WorkSpecBuilder::new("a", "columnSelector").params(select(&["ipc"])).build())
        .build();

    let err = pipeline::run(&specs, &targets(&["plot7"]), RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnknownTarget { id } if id == "plot7"));
}

#[tokio::test]
async fn missing_dependency_is_a_configuration_error() {
    let specs = SpecsBuilder::new()
        .with_spec(
            WorkSpecBuilder::new("agg", "columnSelector")
                .params(select(&["ipc"]))
                .after("parse")
                .build(),
        )
        .build();

    let err = pipeline::run(&specs, &targets(&["agg"]), RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Configuration { id, .. } if id == "parse"));
}

#[tokio::test]
async fn unknown_kind_and_bad_params_fail_at_preparation() {
    let pipeline = Pipeline::default();

    let specs = SpecsBuilder::new().with_step("p", "pivot", &[]).build();
    let err = pipeline.prepare(&specs, &targets(&["p"])).unwrap_err();
    match err {
        PipelineError::Configuration { id, reason } => {
            assert_eq!(id, "p");
            assert!(reason.contains("pivot"));
        }
        other => panic!("expected Configuration, got {other:?}"),
    }

    let specs = SpecsBuilder::new()
        .with_spec(WorkSpecBuilder::new("m", "mean").params(json!({"meanVars": []})).build())
        .build();
    let err = pipeline.prepare(&specs, &targets(&["m"])).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration { id, .. } if id == "m"));
}

#[tokio::test]
async fn failing_shaper_reports_cause_and_blocked_dependents() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let source = write_stats(dir.path());

    let specs = SpecsBuilder::new()
        .with_spec(WorkSpecBuilder::new("ok", "columnSelector").params(select(&["ipc"])).build())
        .with_spec(WorkSpecBuilder::new("bad", "columnSelector").params(select(&["power"])).build())
        .with_spec(
            WorkSpecBuilder::new("uses_bad", "columnSelector")
                .params(select(&["power"]))
                .after("bad")
                .build(),
        )
        .with_spec(
            WorkSpecBuilder::new("final", "concat")
                .after("ok")
                .after("uses_bad")
                .build(),
        )
        .build();

    let options = RunOptions {
        artifact_dir: Some(scratch.path().to_path_buf()),
        ..RunOptions::default().with_source(&source)
    };
    let err = with_timeout(pipeline::run(&specs, &targets(&["final"]), options))
        .await
        .unwrap_err();

    match err {
        PipelineError::Execution { id, cause, blocked } => {
            assert_eq!(id, "bad");
            assert!(cause.contains("power"), "cause: {cause}");
            assert_eq!(blocked, ["final", "uses_bad"]);
        }
        other => panic!("expected Execution, got {other:?}"),
    }
    assert_eq!(entries(scratch.path()), 0);
}

#[tokio::test]
async fn panicking_shaper_is_attributed_to_its_work() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = write_stats(dir.path());

    let mut registry = ShaperRegistry::builtin();
    registry.register("explode", build_explode);
    let pipeline = Pipeline::new(registry, Arc::new(TsvStorage));

    let specs = SpecsBuilder::new()
        .with_step("boom", "explode", &[])
        .with_spec(WorkSpecBuilder::new("fine", "columnSelector").params(select(&["ipc"])).build())
        .build();

    let err = with_timeout(pipeline.run(
        &specs,
        &targets(&["boom", "fine"]),
        RunOptions::default().with_source(&source),
    ))
    .await
    .unwrap_err();

    match err {
        PipelineError::Execution { id, cause, blocked } => {
            assert_eq!(id, "boom");
            assert!(cause.contains("table exploded"), "cause: {cause}");
            assert!(blocked.is_empty());
        }
        other => panic!("expected Execution, got {other:?}"),
    }
}

#[tokio::test]
async fn roots_without_source_fail_on_arity() {
    init_tracing();
    let specs = SpecsBuilder::new()
        .with_spec(WorkSpecBuilder::new("a", "columnSelector").params(select(&["ipc"])).build())
        .build();

    let err = with_timeout(pipeline::run(&specs, &targets(&["a"]), RunOptions::default()))
        .await
        .unwrap_err();
    match err {
        PipelineError::Execution { id, cause, .. } => {
            assert_eq!(id, "a");
            assert!(cause.contains("got 0"), "cause: {cause}");
        }
        other => panic!("expected Execution, got {other:?}"),
    }
}

#[tokio::test]
async fn works_queued_behind_a_failure_never_run() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = write_stats(dir.path());

    let mut registry = ShaperRegistry::builtin();
    registry.register("counted", build_counted);
    let pipeline = Pipeline::new(registry, Arc::new(TsvStorage));

    // "a" is dispatched first and takes the only slot; the rest wait for it.
    let specs = SpecsBuilder::new()
        .with_spec(WorkSpecBuilder::new("a", "columnSelector").params(select(&["power"])).build())
        .with_step("b", "counted", &[])
        .with_step("c", "counted", &[])
        .with_step("d", "counted", &[])
        .with_step("e", "counted", &[])
        .build();

    let err = with_timeout(pipeline.run(
        &specs,
        &targets(&["a", "b", "c", "d", "e"]),
        RunOptions::default().with_source(&source).with_workers(1),
    ))
    .await
    .unwrap_err();

    match err {
        PipelineError::Execution { id, blocked, .. } => {
            assert_eq!(id, "a");
            assert!(blocked.is_empty());
        }
        other => panic!("expected Execution, got {other:?}"),
    }
    assert_eq!(COUNTED_RUNS.load(Ordering::SeqCst), 0);
}
