// src/artifacts.rs

//! Temporary artifacts produced between pipeline steps.
//!
//! Every run owns one [`TempArtifacts`] directory. Output paths are reserved
//! when a work becomes Ready and written later by the worker. Everything in
//! the directory is removed exactly once when the run is torn down, whether
//! it succeeded, failed or was dropped half-way.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::engine::WorkId;
use crate::errors::{PipelineError, Result};

const DIR_PREFIX: &str = "shaperdag-";
const ARTIFACT_EXT: &str = "tsv";

/// Scoped owner of all intermediate tables of one run.
#[derive(Debug)]
pub struct TempArtifacts {
    dir: Option<TempDir>,
    root: PathBuf,
    allocated: Vec<PathBuf>,
}

impl TempArtifacts {
    /// Create a fresh directory under the system temp dir.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(DIR_PREFIX).tempdir()?;
        Ok(Self::from_dir(dir))
    }

    /// Create a fresh directory under `parent`, which is created if needed.
    pub fn new_in(parent: &Path) -> Result<Self> {
        fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(parent)?;
        Ok(Self::from_dir(dir))
    }

    fn from_dir(dir: TempDir) -> Self {
        let root = dir.path().to_path_buf();
        debug!(dir = %root.display(), "created artifact directory");
        Self {
            dir: Some(dir),
            root,
            allocated: Vec::new(),
        }
    }

    /// Directory holding this run's artifacts.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a new output path for `id`. Only the name is reserved; the
    /// file is produced later by whoever runs the work.
    ///
    /// A running sequence number keeps names unique even for ids that
    /// sanitise to the same string.
    pub fn allocate(&mut self, id: &str) -> PathBuf {
        let name = format!(
            "{:04}-{}.{}",
            self.allocated.len(),
            sanitize(id),
            ARTIFACT_EXT
        );
        let path = self.root.join(name);
        debug!(work = %id, path = %path.display(), "allocated artifact path");
        self.allocated.push(path.clone());
        path
    }

    /// Whether the directory has already been removed.
    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }

    /// Remove every allocated file and the directory itself.
    ///
    /// Calling this again after a successful release does nothing.
    pub fn release(&mut self) -> Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };

        let mut first_error: Option<io::Error> = None;
        for path in self.allocated.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove artifact");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Err(e) = dir.close() {
            warn!(dir = %self.root.display(), error = %e, "failed to remove artifact directory");
            first_error.get_or_insert(e);
        }

        debug!(dir = %self.root.display(), "released artifact directory");
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "artifact cleanup on drop failed");
        }
    }
}

/// Keep file names portable: anything outside `[A-Za-z0-9_-]` becomes `_`.
fn sanitize(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "work".to_string()
    } else {
        cleaned
    }
}

/// Successful result of a pipeline run.
///
/// The paths stay readable for as long as this value lives. Copy anything
/// you need to keep with [`RunOutput::persist`]; dropping the value removes
/// the artifacts.
#[derive(Debug)]
pub struct RunOutput {
    paths: BTreeMap<WorkId, PathBuf>,
    artifacts: TempArtifacts,
}

impl RunOutput {
    pub(crate) fn new(paths: BTreeMap<WorkId, PathBuf>, artifacts: TempArtifacts) -> Self {
        Self { paths, artifacts }
    }

    /// Output path of every work that ran, keyed by id.
    pub fn paths(&self) -> &BTreeMap<WorkId, PathBuf> {
        &self.paths
    }

    pub fn path(&self, id: &str) -> Option<&Path> {
        self.paths.get(id).map(PathBuf::as_path)
    }

    /// Copy the output of `id` to `dest`, creating parent directories.
    /// The copy is not touched by cleanup.
    pub fn persist(&self, id: &str, dest: &Path) -> Result<PathBuf> {
        let src = self
            .paths
            .get(id)
            .ok_or_else(|| PipelineError::UnknownTarget { id: id.to_string() })?;

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::copy(src, dest)?;
        debug!(work = %id, dest = %dest.display(), "persisted artifact");
        Ok(dest.to_path_buf())
    }

    /// Release the artifacts now and report cleanup errors instead of only
    /// logging them.
    pub fn close(mut self) -> Result<()> {
        self.artifacts.release()
    }
}
