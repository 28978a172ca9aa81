// src/config/mod.rs

//! Pipeline file loading.
//!
//! - [`model`] mirrors the on-disk layout.
//! - [`loader`] reads TOML or JSON from disk.
//! - [`validate`] turns a raw file into a [`PipelineFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{DependencyClause, PipelineFile, PoolSection, RawPipelineFile, ShaperConfig};
