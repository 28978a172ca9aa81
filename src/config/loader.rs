// src/config/loader.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{PipelineFile, RawPipelineFile, ShaperConfig};
use crate::errors::Result;

/// Load a pipeline file and return the raw `RawPipelineFile`.
///
/// `.json` files are read as a bare id -> step map; anything else is TOML.
/// This only deserialises; use [`load_and_validate`] for sanity checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let raw = if is_json {
        let steps: BTreeMap<String, ShaperConfig> = serde_json::from_str(&contents)?;
        RawPipelineFile::from_step_map(steps)
    } else {
        toml::from_str(&contents)?
    };

    debug!(path = %path.display(), steps = raw.shaper.len(), "loaded pipeline file");
    Ok(raw)
}

/// Load a pipeline file and run file-level validation.
///
/// This is the recommended entry point for the rest of the application.
/// The returned specs still go through [`crate::dag::DependencyGraph::build`]
/// before anything runs.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let raw = load_from_path(&path)?;
    PipelineFile::try_from(raw)
}
