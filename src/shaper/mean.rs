// src/shaper/mean.rs

//! Group means appended as summary rows.
//!
//! For every group of `groupingColumns` a new row is appended after the
//! original data. The row carries the group key, the mean of each
//! `meanVars` column, the algorithm name in `replacingColumn`, and the first
//! value seen in the group for every other column. Blank cells are skipped.

use serde::Deserialize;
use serde_json::Value;

use super::{Shaper, ShaperError, parse_params, require_column, single_input};
use crate::table::{Table, format_number};
use crate::types::MeanAlgorithm;

pub const KIND: &str = "mean";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Params {
    mean_vars: Vec<String>,
    mean_algorithm: MeanAlgorithm,
    #[serde(default)]
    grouping_columns: Option<Vec<String>>,
    /// Older configs name a single grouping column.
    #[serde(default)]
    grouping_column: Option<String>,
    replacing_column: String,
}

#[derive(Debug)]
pub struct Mean {
    mean_vars: Vec<String>,
    algorithm: MeanAlgorithm,
    grouping_columns: Vec<String>,
    replacing_column: String,
}

pub fn build(params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
    let p: Params = parse_params(KIND, params)?;
    if p.mean_vars.is_empty() {
        return Err(ShaperError::InvalidParams {
            kind: KIND.to_string(),
            reason: "'meanVars' must name at least one column".to_string(),
        });
    }

    let grouping_columns = match (p.grouping_columns, p.grouping_column) {
        (Some(cols), _) => cols,
        (None, Some(col)) => vec![col],
        (None, None) => Vec::new(),
    };

    Ok(Box::new(Mean {
        mean_vars: p.mean_vars,
        algorithm: p.mean_algorithm,
        grouping_columns,
        replacing_column: p.replacing_column,
    }))
}

impl Mean {
    fn parse_value(&self, table: &Table, row: usize, col: usize) -> Result<Option<f64>, ShaperError> {
        let cell = table.cell(row, col).unwrap_or("").trim();
        if cell.is_empty() {
            return Ok(None);
        }
        cell.parse::<f64>().map(Some).map_err(|_| ShaperError::Data {
            kind: KIND,
            reason: format!(
                "column '{}' must be numeric (found '{}')",
                table.columns()[col],
                cell
            ),
        })
    }
}

impl Shaper for Mean {
    fn apply(&self, inputs: Vec<Table>) -> Result<Table, ShaperError> {
        let mut table = single_input(KIND, inputs)?;

        let var_cols = self
            .mean_vars
            .iter()
            .map(|c| require_column(KIND, &table, c))
            .collect::<Result<Vec<_>, _>>()?;
        let group_cols = self
            .grouping_columns
            .iter()
            .map(|c| require_column(KIND, &table, c))
            .collect::<Result<Vec<_>, _>>()?;
        let replace_col = require_column(KIND, &table, &self.replacing_column)?;

        // Groups in first-seen order: (key, member rows).
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

        let mut summaries = Vec::with_capacity(groups.len());
        for (key, members) in &groups {
            // Start from the group's first row so other columns carry over.
            let mut summary = table.rows()[members[0]].clone();

            for &col in &var_cols {
                let mut values = Vec::with_capacity(members.len());
                for &row in members {
                    if let Some(v) = self.parse_value(&table, row, col)? {
                        values.push(v);
                    }
                }
                summary[col] = match self.algorithm.combine(&values) {
                    Some(m) => format_number(m),
                    None if values.is_empty() => String::new(),
                    None => {
                        return Err(ShaperError::Data {
                            kind: KIND,
                            reason: format!(
                                "{} is undefined for column '{}' in group {:?}",
                                self.algorithm,
                                table.columns()[col],
                                key
                            ),
                        });
                    }
                };
            }

            summary[replace_col] = self.algorithm.as_str().to_string();
            summaries.push(summary);
        }

        for summary in summaries {
            table.push_row(summary);
        }
        Ok(table)
    }
}
