// tests/integration/config_loading.rs

use std::io::Write;
use std::path::PathBuf;

use tempfile::{Builder, NamedTempFile};
use shaperdag::config::{DependencyClause, load_and_validate, load_from_path};
use shaperdag::dag::DependencyGraph;
use shaperdag::errors::PipelineError;

fn file_with(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn toml_pipeline_accepts_string_and_list_after() {
    let file = file_with(
        ".toml",
        r#"
[pool]
workers = 3
artifact_dir = "/tmp/shaperdag-scratch"

[shaper.parse]
type = "columnSelector"
params = { columns = ["benchmark", "ipc"] }

[shaper.agg]
type = "mean"
after = "parse"
params = { meanVars = ["ipc"], meanAlgorithm = "geomean", replacingColumn = "benchmark" }

[shaper.both]
type = "concat"
after = ["agg", "parse"]
"#,
    );

    let raw = load_from_path(file.path()).unwrap();
    assert_eq!(raw.shaper["agg"].after, DependencyClause::One("parse".into()));

    let pipeline = load_and_validate(file.path()).unwrap();
    assert_eq!(pipeline.pool.workers, Some(3));
    assert_eq!(
        pipeline.pool.artifact_dir,
        Some(PathBuf::from("/tmp/shaperdag-scratch"))
    );
    assert_eq!(pipeline.specs["agg"].dependencies, ["parse"]);
    assert_eq!(pipeline.specs["both"].dependencies, ["agg", "parse"]);
    assert_eq!(pipeline.specs["parse"].params["columns"][1], "ipc");

    let graph = DependencyGraph::build(&pipeline.specs).unwrap();
    assert_eq!(graph.topological_order(), ["parse", "agg", "both"]);
}

#[test]
fn json_pipeline_is_a_bare_step_map() {
    let file = file_with(
        ".json",
        r#"{
  "parse": {"type": "columnSelector", "params": {"columns": ["ipc"]}},
  "agg": {"type": "mean", "after": ["parse"],
          "params": {"meanVars": ["ipc"], "meanAlgorithm": "hmean", "replacingColumn": "ipc"}}
}"#,
    );

    let pipeline = load_and_validate(file.path()).unwrap();
    assert_eq!(pipeline.pool.workers, None);
    assert_eq!(pipeline.specs.len(), 2);
    assert_eq!(pipeline.specs["agg"].kind, "mean");
}

#[test]
fn zero_workers_is_rejected() {
    let file = file_with(
        ".toml",
        r#"
[pool]
workers = 0

[shaper.a]
type = "sort"
"#,
    );
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration { reason, .. } if reason.contains("workers")));
}

#[test]
fn empty_type_is_rejected() {
    let file = file_with(".toml", "[shaper.a]\ntype = \"  \"\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration { id, .. } if id == "a"));
}

#[test]
fn pipeline_without_steps_is_rejected() {
    let file = file_with(".toml", "[pool]\nworkers = 2\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(PipelineError::Configuration { .. })
    ));
}

#[test]
fn malformed_files_surface_parser_errors() {
    let toml = file_with(".toml", "[shaper.a\ntype = 1");
    assert!(matches!(load_from_path(toml.path()), Err(PipelineError::Toml(_))));

    let json = file_with(".json", "{\"a\": ");
    assert!(matches!(load_from_path(json.path()), Err(PipelineError::Json(_))));
}

#[test]
fn blank_after_clause_is_malformed_once_built() {
    let file = file_with(
        ".toml",
        r#"
[shaper.a]
type = "sort"

[shaper.b]
type = "sort"
after = " "
"#,
    );

    let pipeline = load_and_validate(file.path()).unwrap();
    let err = DependencyGraph::build(&pipeline.specs).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration { id, .. } if id == "b"));
}
