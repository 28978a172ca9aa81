// src/shaper/mod.rs

//! Pluggable table transformations ("shapers").
//!
//! - [`Shaper`] is the capability every work kind provides.
//! - [`ShaperRegistry`] maps a kind string to a constructor. Graph
//!   preparation instantiates every spec once through the registry, so an
//!   unknown kind or malformed params is reported before any work starts.
//! - The built-in kinds live in the submodules and are registered by
//!   [`ShaperRegistry::builtin`].

pub mod column_selector;
pub mod concat;
pub mod condition_selector;
pub mod mean;
pub mod normalize;
pub mod sort;

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::table::Table;

/// Errors raised while building or applying a shaper.
#[derive(Error, Debug)]
pub enum ShaperError {
    #[error("unknown shaper type '{kind}' (available: {available})")]
    UnknownKind { kind: String, available: String },

    #[error("invalid params for '{kind}': {reason}")]
    InvalidParams { kind: String, reason: String },

    #[error("'{kind}' expects {expected} input table(s), got {got}")]
    InputArity {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("'{kind}': column '{column}' not found")]
    MissingColumn { kind: &'static str, column: String },

    #[error("'{kind}': {reason}")]
    Data { kind: &'static str, reason: String },
}

/// A configured transformation from input tables to one output table.
pub trait Shaper: Send + Sync + fmt::Debug {
    /// Apply the transformation to the ordered inputs.
    fn apply(&self, inputs: Vec<Table>) -> Result<Table, ShaperError>;
}

/// Constructor stored in the registry.
pub type ShaperConstructor = fn(&Value) -> Result<Box<dyn Shaper>, ShaperError>;

/// Registry of shaper constructors keyed by kind.
#[derive(Clone, Default)]
pub struct ShaperRegistry {
    constructors: BTreeMap<String, ShaperConstructor>,
}

impl fmt::Debug for ShaperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaperRegistry")
            .field("kinds", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ShaperRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in kind.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(column_selector::KIND, column_selector::build);
        registry.register(condition_selector::KIND, condition_selector::build);
        registry.register(sort::KIND, sort::build);
        registry.register(mean::KIND, mean::build);
        registry.register(normalize::KIND, normalize::build);
        registry.register(concat::KIND, concat::build);
        registry
    }

    /// Register (or replace) a kind.
    pub fn register(&mut self, kind: impl Into<String>, constructor: ShaperConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Build a shaper for `kind` configured with `params`.
    pub fn instantiate(&self, kind: &str, params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
        match self.constructors.get(kind) {
            Some(constructor) => constructor(params),
            None => Err(ShaperError::UnknownKind {
                kind: kind.to_string(),
                available: self.kinds().collect::<Vec<_>>().join(", "),
            }),
        }
    }
}

/// Deserialize a shaper's params, treating `null` as an empty object.
pub(crate) fn parse_params<T: DeserializeOwned>(kind: &str, params: &Value) -> Result<T, ShaperError> {
    let value = match params {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|e| ShaperError::InvalidParams {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

/// Unwrap the single input of a one-table shaper.
pub(crate) fn single_input(kind: &'static str, mut inputs: Vec<Table>) -> Result<Table, ShaperError> {
    if inputs.len() != 1 {
        return Err(ShaperError::InputArity {
            kind,
            expected: 1,
            got: inputs.len(),
        });
    }
    Ok(inputs.remove(0))
}

/// Resolve a column name or fail with [`ShaperError::MissingColumn`].
pub(crate) fn require_column(kind: &'static str, table: &Table, column: &str) -> Result<usize, ShaperError> {
    table
        .column_index(column)
        .ok_or_else(|| ShaperError::MissingColumn {
            kind,
            column: column.to_string(),
        })
}
