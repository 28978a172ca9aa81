#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use shaperdag::dag::WorkSpec;

/// Builder for a spec map to simplify test setup.
pub struct SpecsBuilder {
    specs: BTreeMap<String, WorkSpec>,
}

impl SpecsBuilder {
    pub fn new() -> Self {
        Self {
            specs: BTreeMap::new(),
        }
    }

    pub fn with_spec(mut self, spec: WorkSpec) -> Self {
        self.specs.insert(spec.id.clone(), spec);
        self
    }

    /// Add a step of kind `kind` that runs after every id in `after`.
    pub fn with_step(self, id: &str, kind: &str, after: &[&str]) -> Self {
        self.with_spec(WorkSpecBuilder::new(id, kind).after_all(after).build())
    }

    pub fn build(self) -> BTreeMap<String, WorkSpec> {
        self.specs
    }
}

impl Default for SpecsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a single `WorkSpec`.
pub struct WorkSpecBuilder {
    spec: WorkSpec,
}

impl WorkSpecBuilder {
    pub fn new(id: &str, kind: &str) -> Self {
        Self {
            spec: WorkSpec::new(id, kind),
        }
    }

    pub fn params(mut self, params: Value) -> Self {
        self.spec.params = params;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.spec.dependencies.push(dep.to_string());
        self
    }

    pub fn after_all(mut self, deps: &[&str]) -> Self {
        self.spec
            .dependencies
            .extend(deps.iter().map(|d| d.to_string()));
        self
    }

    pub fn build(self) -> WorkSpec {
        self.spec
    }
}

/// Target set from string literals.
pub fn targets(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}
