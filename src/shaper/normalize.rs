// src/shaper/normalize.rs

//! Normalization against a baseline row.
//!
//! Rows are grouped by `groupBy`. In each group exactly one row must have
//! `normalizerColumn == normalizerValue`; the sum of its `normalizerVars`
//! (default: `normalizeVars`) is the denominator every `normalizeVars` cell
//! of the group is divided by. A zero denominator zeroes the columns.
//! `<var>.sd` columns are scaled the same way unless `normalizeSd = false`.

use serde::Deserialize;
use serde_json::Value;

use super::{Shaper, ShaperError, parse_params, require_column, single_input};
use crate::table::{Table, format_number};

pub const KIND: &str = "normalize";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Params {
    normalize_vars: Vec<String>,
    #[serde(default)]
    normalizer_vars: Option<Vec<String>>,
    normalizer_column: String,
    normalizer_value: Value,
    group_by: Vec<String>,
    #[serde(default = "default_normalize_sd")]
    normalize_sd: bool,
}

fn default_normalize_sd() -> bool {
    true
}

#[derive(Debug)]
pub struct Normalize {
    normalize_vars: Vec<String>,
    normalizer_vars: Vec<String>,
    normalizer_column: String,
    normalizer_value: String,
    group_by: Vec<String>,
    normalize_sd: bool,
}

pub fn build(params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
    let p: Params = parse_params(KIND, params)?;
    let invalid = |reason: &str| ShaperError::InvalidParams {
        kind: KIND.to_string(),
        reason: reason.to_string(),
    };

    if p.normalize_vars.is_empty() {
        return Err(invalid("'normalizeVars' must name at least one column"));
    }
    if p.group_by.is_empty() {
        return Err(invalid("'groupBy' must name at least one column"));
    }

    let normalizer_value = match p.normalizer_value {
        Value::String(s) => s,
        Value::Null => return Err(invalid("'normalizerValue' is required")),
        other => other.to_string(),
    };

    Ok(Box::new(Normalize {
        normalizer_vars: p
            .normalizer_vars
            .unwrap_or_else(|| p.normalize_vars.clone()),
        normalize_vars: p.normalize_vars,
        normalizer_column: p.normalizer_column,
        normalizer_value,
        group_by: p.group_by,
        normalize_sd: p.normalize_sd,
    }))
}

fn numeric_cell(table: &Table, row: usize, col: usize) -> Result<f64, ShaperError> {
    table.numeric(row, col).ok_or_else(|| ShaperError::Data {
        kind: KIND,
        reason: format!(
            "column '{}' must be numeric (row {})",
            table.columns()[col],
            row + 1
        ),
    })
}

impl Shaper for Normalize {
    fn apply(&self, inputs: Vec<Table>) -> Result<Table, ShaperError> {
        let mut table = single_input(KIND, inputs)?;

        let target_cols = self
            .normalize_vars
            .iter()
            .map(|c| require_column(KIND, &table, c))
            .collect::<Result<Vec<_>, _>>()?;
        let denominator_cols = self
            .normalizer_vars
            .iter()
            .map(|c| require_column(KIND, &table, c))
            .collect::<Result<Vec<_>, _>>()?;
        let group_cols = self
            .group_by
            .iter()
            .map(|c| require_column(KIND, &table, c))
            .collect::<Result<Vec<_>, _>>()?;
        let marker_col = require_column(KIND, &table, &self.normalizer_column)?;

        // Columns scaled together with each target: the target itself and,
        // when enabled and present, its `.sd` companion.
        let mut scaled_cols = target_cols.clone();
        if self.normalize_sd {
            for var in &self.normalize_vars {
                if let Some(sd) = table.column_index(&format!("{var}.sd")) {
                    scaled_cols.push(sd);
                }
            }
        }

        let mut groups: Vec<(Vec<String>, Vec<usize>)> = Vec::new();
        for row in 0..table.len() {
            let key: Vec<String> = group_cols
                .iter()
                .map(|&c| table.rows()[row][c].clone())
                .collect();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(row),
                None => groups.push((key, vec![row])),
            }
        }

        let mut updates: Vec<(usize, usize, String)> = Vec::new();
        for (key, members) in &groups {
            let baselines: Vec<usize> = members
                .iter()
                .copied()
                .filter(|&r| table.rows()[r][marker_col] == self.normalizer_value)
                .collect();
            let baseline = match baselines.as_slice() {
                [single] => *single,
                other => {
                    return Err(ShaperError::Data {
                        kind: KIND,
                        reason: format!(
                            "group {:?} has {} baseline rows with {} = '{}'; exactly one is required",
                            key,
                            other.len(),
                            self.normalizer_column,
                            self.normalizer_value
                        ),
                    });
                }
            };

            let mut denominator = 0.0;
            for &col in &denominator_cols {
                denominator += numeric_cell(&table, baseline, col)?;
            }

            for &row in members {
                for &col in &scaled_cols {
                    let scaled = if denominator == 0.0 {
                        0.0
                    } else {
                        numeric_cell(&table, row, col)? / denominator
                    };
                    updates.push((row, col, format_number(scaled)));
                }
            }
        }

        let rows = table.rows_mut();
        for (row, col, value) in updates {
            rows[row][col] = value;
        }
        Ok(table)
    }
}
