// src/config/validate.rs

//! File-level sanity checks. Graph-level checks (references, cycles, kinds)
//! happen when the dependency graph is built.

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::{PipelineError, Result};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = PipelineError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_pipeline(&raw)?;
        Ok(PipelineFile::new_unchecked(raw.pool, raw.shaper))
    }
}

fn validate_raw_pipeline(cfg: &RawPipelineFile) -> Result<()> {
    ensure_has_steps(cfg)?;
    validate_pool(cfg)?;
    validate_kinds_present(cfg)?;
    Ok(())
}

fn ensure_has_steps(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.shaper.is_empty() {
        return Err(PipelineError::configuration(
            "<pipeline>",
            "pipeline must contain at least one [shaper.<id>] section",
        ));
    }
    Ok(())
}

fn validate_pool(cfg: &RawPipelineFile) -> Result<()> {
    if cfg.pool.workers == Some(0) {
        return Err(PipelineError::configuration(
            "<pool>",
            "[pool].workers must be >= 1 (got 0)",
        ));
    }
    Ok(())
}

fn validate_kinds_present(cfg: &RawPipelineFile) -> Result<()> {
    for (id, step) in cfg.shaper.iter() {
        if step.kind.trim().is_empty() {
            return Err(PipelineError::configuration(id.clone(), "`type` must not be empty"));
        }
    }
    Ok(())
}
