// src/shaper/column_selector.rs

use serde::Deserialize;
use serde_json::Value;

use super::{Shaper, ShaperError, parse_params, require_column, single_input};
use crate::table::Table;

pub const KIND: &str = "columnSelector";

#[derive(Debug, Deserialize)]
struct Params {
    columns: Vec<String>,
}

/// Keeps the listed columns, in the listed order.
#[derive(Debug)]
pub struct ColumnSelector {
    columns: Vec<String>,
}

pub fn build(params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
    let p: Params = parse_params(KIND, params)?;
    if p.columns.is_empty() {
        return Err(ShaperError::InvalidParams {
            kind: KIND.to_string(),
            reason: "'columns' must name at least one column".to_string(),
        });
    }
    Ok(Box::new(ColumnSelector { columns: p.columns }))
}

impl Shaper for ColumnSelector {
    fn apply(&self, inputs: Vec<Table>) -> Result<Table, ShaperError> {
        let input = single_input(KIND, inputs)?;

        let indices = self
            .columns
            .iter()
            .map(|c| require_column(KIND, &input, c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Table::new(self.columns.iter().cloned());
        for row in input.rows() {
            out.push_row(indices.iter().map(|&i| row[i].clone()).collect());
        }
        Ok(out)
    }
}
