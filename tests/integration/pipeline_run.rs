// tests/integration/pipeline_run.rs

use serde_json::json;
use shaperdag::pipeline::{self, RunOptions};
use shaperdag::table::{Storage, Table, TsvStorage};

use crate::common::builders::{SpecsBuilder, WorkSpecBuilder, targets};
use crate::common::{entries, init_tracing, with_timeout, write_stats};

#[tokio::test]
async fn parse_then_agg_produces_both_outputs() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = write_stats(dir.path());

    let specs = SpecsBuilder::new()
        .with_spec(
            WorkSpecBuilder::new("parse", "columnSelector")
                .params(json!({"columns": ["benchmark", "config", "ipc"]}))
                .build(),
        )
        .with_spec(
            WorkSpecBuilder::new("agg", "mean")
                .params(json!({
                    "meanVars": ["ipc"],
                    "meanAlgorithm": "arithmean",
                    "groupingColumns": ["config"],
                    "replacingColumn": "benchmark"
                }))
                .after("parse")
                .build(),
        )
        .build();

    let options = RunOptions::default().with_source(&source).with_workers(2);
    let output = with_timeout(pipeline::run(&specs, &targets(&["agg"]), options))
        .await
        .unwrap();

    assert_eq!(output.paths().keys().collect::<Vec<_>>(), ["agg", "parse"]);

    let parsed = TsvStorage.read_table(output.path("parse").unwrap()).unwrap();
    assert_eq!(parsed.columns(), ["benchmark", "config", "ipc"]);
    assert_eq!(parsed.len(), 4);

    let agg = TsvStorage.read_table(output.path("agg").unwrap()).unwrap();
    assert_eq!(agg.len(), 6);
    assert_eq!(agg.rows()[4], vec!["arithmean", "base", "2.5"]);
    assert_eq!(agg.rows()[5], vec!["arithmean", "tx", "5"]);
}

#[tokio::test]
async fn multi_input_step_reads_dependencies_in_declared_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = write_stats(dir.path());

    let specs = SpecsBuilder::new()
        .with_spec(
            WorkSpecBuilder::new("mcf", "conditionSelector")
                .params(json!({"column": "benchmark", "values": ["mcf"]}))
                .build(),
        )
        .with_spec(
            WorkSpecBuilder::new("lbm", "conditionSelector")
                .params(json!({"column": "benchmark", "values": ["lbm"]}))
                .build(),
        )
        .with_spec(
            WorkSpecBuilder::new("both", "concat")
                .after("lbm")
                .after("mcf")
                .build(),
        )
        .build();

    let output = with_timeout(pipeline::run(
        &specs,
        &targets(&["both"]),
        RunOptions::default().with_source(&source),
    ))
    .await
    .unwrap();

    let both = TsvStorage.read_table(output.path("both").unwrap()).unwrap();
    let benchmarks: Vec<_> = both.column_values(0).collect();
    assert_eq!(benchmarks, ["lbm", "lbm", "mcf", "mcf"]);
}

#[tokio::test]
async fn persisted_output_survives_and_the_rest_is_removed() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let source = write_stats(dir.path());

    let specs = SpecsBuilder::new()
        .with_spec(
            WorkSpecBuilder::new("sorted", "sort")
                .params(json!({"order_dict": {"config": ["tx", "base"]}}))
                .build(),
        )
        .build();

    let options = RunOptions {
        artifact_dir: Some(scratch.path().to_path_buf()),
        ..RunOptions::default().with_source(&source)
    };
    let output = with_timeout(pipeline::run(&specs, &targets(&["sorted"]), options))
        .await
        .unwrap();

    let kept = dir.path().join("out").join("sorted.tsv");
    output.persist("sorted", &kept).unwrap();
    let temp = output.path("sorted").unwrap().to_path_buf();
    output.close().unwrap();

    assert!(!temp.exists());
    assert_eq!(entries(scratch.path()), 0);

    let table: Table = TsvStorage.read_table(&kept).unwrap();
    assert_eq!(table.column_values(1).collect::<Vec<_>>(), ["tx", "tx", "base", "base"]);
}

#[tokio::test]
async fn results_cover_exactly_the_target_closure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = write_stats(dir.path());
    let select = |cols: &[&str]| json!({ "columns": cols });

    let specs = SpecsBuilder::new()
        .with_spec(WorkSpecBuilder::new("a", "columnSelector").params(select(&["benchmark", "ipc"])).build())
        .with_spec(WorkSpecBuilder::new("b", "columnSelector").params(select(&["ipc"])).after("a").build())
        .with_spec(WorkSpecBuilder::new("c", "columnSelector").params(select(&["cycles"])).build())
        .build();

    let output = with_timeout(pipeline::run(
        &specs,
        &targets(&["b"]),
        RunOptions::default().with_source(&source),
    ))
    .await
    .unwrap();

    assert_eq!(output.paths().keys().collect::<Vec<_>>(), ["a", "b"]);
}
