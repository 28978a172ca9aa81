// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::dag::WorkSpec;

/// Pipeline file as read from disk, before validation.
///
/// TOML shape:
///
/// ```toml
/// [pool]
/// workers = 4
/// artifact_dir = "/scratch/shaperdag"
///
/// [shaper.parse]
/// type = "columnSelector"
/// params = { columns = ["benchmark", "config", "ipc"] }
///
/// [shaper.agg]
/// type = "mean"
/// after = "parse"
/// params = { meanVars = ["ipc"], meanAlgorithm = "geomean", groupingColumns = ["config"], replacingColumn = "benchmark" }
/// ```
///
/// JSON files carry only the step map (`{"parse": {"type": ...}}`), see
/// [`RawPipelineFile::from_step_map`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub pool: PoolSection,

    /// All steps from `[shaper.<id>]`, keyed by id.
    #[serde(default)]
    pub shaper: BTreeMap<String, ShaperConfig>,
}

impl RawPipelineFile {
    /// Wrap a bare id -> step map (the JSON layout) with default pool
    /// settings.
    pub fn from_step_map(shaper: BTreeMap<String, ShaperConfig>) -> Self {
        Self {
            pool: PoolSection::default(),
            shaper,
        }
    }
}

/// `[pool]` section.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct PoolSection {
    /// Worker slots. `None` means one less than the logical CPU count.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Parent directory for the per-run artifact directory. `None` means
    /// the system temp dir.
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,
}

/// `[shaper.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ShaperConfig {
    /// Shaper kind, e.g. `"mean"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Passed to the shaper constructor untouched.
    #[serde(default)]
    pub params: Value,

    /// Steps whose output this one consumes, in order.
    #[serde(default)]
    pub after: DependencyClause,
}

/// `after` accepts either a single id or a list of ids.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DependencyClause {
    One(String),
    Many(Vec<String>),
}

impl Default for DependencyClause {
    fn default() -> Self {
        DependencyClause::Many(Vec::new())
    }
}

impl DependencyClause {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            DependencyClause::One(id) => vec![id],
            DependencyClause::Many(ids) => ids,
        }
    }
}

/// Validated pipeline file.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub pool: PoolSection,
    pub specs: BTreeMap<String, WorkSpec>,
}

impl PipelineFile {
    pub(crate) fn new_unchecked(pool: PoolSection, shaper: BTreeMap<String, ShaperConfig>) -> Self {
        let specs = shaper
            .into_iter()
            .map(|(id, cfg)| {
                let spec = WorkSpec {
                    id: id.clone(),
                    kind: cfg.kind,
                    params: cfg.params,
                    dependencies: cfg.after.into_vec(),
                };
                (id, spec)
            })
            .collect();
        Self { pool, specs }
    }
}
