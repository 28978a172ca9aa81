// src/shaper/condition_selector.rs

//! Row filter on one column.
//!
//! Exactly one criterion is applied, checked in this order: `values`
//! (categorical inclusion), `range` (inclusive numeric bounds), then `mode`
//! with its `threshold` or `value`.

use serde::Deserialize;
use serde_json::Value;

use super::{Shaper, ShaperError, parse_params, require_column, single_input};
use crate::table::Table;

pub const KIND: &str = "conditionSelector";

#[derive(Debug, Deserialize)]
struct Params {
    column: String,
    #[serde(default)]
    values: Option<Vec<Value>>,
    #[serde(default)]
    range: Option<Vec<f64>>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    OneOf(Vec<String>),
    Between(f64, f64),
    GreaterThan(f64),
    LessThan(f64),
    Equals(String),
    Contains(String),
}

#[derive(Debug)]
pub struct ConditionSelector {
    column: String,
    condition: Condition,
}

/// JSON scalars compare against cells by their textual form.
fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid(reason: impl Into<String>) -> ShaperError {
    ShaperError::InvalidParams {
        kind: KIND.to_string(),
        reason: reason.into(),
    }
}

pub fn build(params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
    let p: Params = parse_params(KIND, params)?;
    if p.column.trim().is_empty() {
        return Err(invalid("'column' cannot be empty"));
    }

    let condition = if let Some(values) = p.values {
        Condition::OneOf(values.iter().map(scalar_text).collect())
    } else if let Some(range) = p.range {
        match range.as_slice() {
            [lo, hi] => Condition::Between(*lo, *hi),
            _ => return Err(invalid("'range' must be a list of 2 values")),
        }
    } else {
        match p.mode.as_deref() {
            Some(mode @ ("greater_than" | "less_than")) => {
                let t = p
                    .threshold
                    .ok_or_else(|| invalid(format!("'{mode}' mode requires 'threshold'")))?;
                if mode == "greater_than" {
                    Condition::GreaterThan(t)
                } else {
                    Condition::LessThan(t)
                }
            }
            Some(mode @ ("equals" | "contains")) => {
                let v = p
                    .value
                    .as_ref()
                    .map(scalar_text)
                    .ok_or_else(|| invalid(format!("'{mode}' mode requires 'value'")))?;
                if mode == "equals" {
                    Condition::Equals(v)
                } else {
                    Condition::Contains(v)
                }
            }
            Some(other) => return Err(invalid(format!("unknown mode '{other}'"))),
            None => return Err(invalid("one of 'values', 'range' or 'mode' is required")),
        }
    };

    Ok(Box::new(ConditionSelector {
        column: p.column,
        condition,
    }))
}

impl Condition {
    fn matches(&self, cell: &str) -> bool {
        let number = || cell.trim().parse::<f64>().ok();
        match self {
            Condition::OneOf(values) => values.iter().any(|v| v == cell),
            Condition::Between(lo, hi) => number().is_some_and(|x| *lo <= x && x <= *hi),
            Condition::GreaterThan(t) => number().is_some_and(|x| x > *t),
            Condition::LessThan(t) => number().is_some_and(|x| x < *t),
            Condition::Equals(v) => match (number(), v.parse::<f64>().ok()) {
                (Some(a), Some(b)) => a == b,
                _ => cell == v,
            },
            Condition::Contains(v) => cell.contains(v.as_str()),
        }
    }
}

impl Shaper for ConditionSelector {
    fn apply(&self, inputs: Vec<Table>) -> Result<Table, ShaperError> {
        let mut table = single_input(KIND, inputs)?;
        let col = require_column(KIND, &table, &self.column)?;
        table.retain_rows(|row| self.condition.matches(&row[col]));
        Ok(table)
    }
}
