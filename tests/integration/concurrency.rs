// tests/integration/concurrency.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use shaperdag::errors::PipelineError;
use shaperdag::pipeline::{Pipeline, RunOptions};
use shaperdag::shaper::{Shaper, ShaperError, ShaperRegistry};
use shaperdag::table::{Table, TsvStorage};

use crate::common::builders::{SpecsBuilder, targets};
use crate::common::{init_tracing, write_stats};

static ACTIVE: AtomicUsize = AtomicUsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);

/// Sleeps while recording how many instances run at the same time.
#[derive(Debug)]
struct Gauge;

fn build_gauge(_params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
    Ok(Box::new(Gauge))
}

impl Shaper for Gauge {
    fn apply(&self, mut inputs: Vec<Table>) -> Result<Table, ShaperError> {
        let now = ACTIVE.fetch_add(1, Ordering::SeqCst) + 1;
        PEAK.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(100));
        ACTIVE.fetch_sub(1, Ordering::SeqCst);
        Ok(inputs.pop().unwrap_or_default())
    }
}

/// Sleeps long enough to trip a short deadline.
#[derive(Debug)]
struct Sluggish;

fn build_sluggish(_params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
    Ok(Box::new(Sluggish))
}

impl Shaper for Sluggish {
    fn apply(&self, mut inputs: Vec<Table>) -> Result<Table, ShaperError> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(inputs.pop().unwrap_or_default())
    }
}

fn pipeline() -> Pipeline {
    let mut registry = ShaperRegistry::builtin();
    registry.register("gauge", build_gauge);
    registry.register("sluggish", build_sluggish);
    Pipeline::new(registry, Arc::new(TsvStorage))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_workers_never_run_more_than_two_works() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = write_stats(dir.path());

    let ids = ["l1", "l2", "l3", "l4", "l5"];
    let specs = ids
        .iter()
        .fold(SpecsBuilder::new(), |b, id| b.with_step(id, "gauge", &[]))
        .build();

    let options = RunOptions::default().with_source(&source).with_workers(2);
    let output = tokio::time::timeout(
        Duration::from_secs(10),
        pipeline().run(&specs, &targets(&ids), options),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(output.paths().len(), 5);
    let peak = PEAK.load(Ordering::SeqCst);
    assert!(peak <= 2, "observed {peak} concurrent works");
    assert_eq!(peak, 2);
}

#[tokio::test]
async fn overrunning_work_fails_with_timeout() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = write_stats(dir.path());

    let specs = SpecsBuilder::new()
        .with_step("slow", "sluggish", &[])
        .with_step("after_slow", "sluggish", &["slow"])
        .build();

    let options = RunOptions {
        work_timeout: Some(Duration::from_millis(50)),
        ..RunOptions::default().with_source(&source)
    };

    let started = Instant::now();
    let err = pipeline()
        .run(&specs, &targets(&["after_slow"]), options)
        .await
        .unwrap_err();

    match err {
        PipelineError::Execution { id, cause, blocked } => {
            assert_eq!(id, "slow");
            assert!(cause.contains("timed out"), "cause: {cause}");
            assert_eq!(blocked, ["after_slow"]);
        }
        other => panic!("expected Execution error, got {other:?}"),
    }
    // The run only returns once the stuck worker has really finished.
    assert!(started.elapsed() >= Duration::from_millis(300));
}
