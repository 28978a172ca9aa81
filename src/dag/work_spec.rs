// src/dag/work_spec.rs

use serde_json::Value;

/// Declarative description of one pipeline step.
///
/// `dependencies` keeps the order the step was declared with; that order is
/// the order in which predecessor outputs are handed to the shaper.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkSpec {
    pub id: String,
    pub kind: String,
    pub params: Value,
    pub dependencies: Vec<String>,
}

impl WorkSpec {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            params: Value::Null,
            dependencies: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn after(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }
}
