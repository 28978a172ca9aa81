// src/shaper/concat.rs

//! Multi-input shaper: stacks its inputs in dependency order.
//!
//! The output header is the union of the input headers in first-seen order;
//! cells for columns an input lacks are left blank.

use serde_json::Value;

use super::{Shaper, ShaperError};
use crate::table::Table;

pub const KIND: &str = "concat";

#[derive(Debug)]
pub struct Concat;

pub fn build(_params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
    Ok(Box::new(Concat))
}

impl Shaper for Concat {
    fn apply(&self, inputs: Vec<Table>) -> Result<Table, ShaperError> {
        if inputs.is_empty() {
            return Err(ShaperError::InputArity {
                kind: KIND,
                expected: 1,
                got: 0,
            });
        }

        let mut columns: Vec<String> = Vec::new();
        for input in &inputs {
            for c in input.columns() {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }

        let mut out = Table::new(columns.iter().cloned());
        for input in inputs {
            let (input_columns, rows) = input.into_parts();
            let mapping: Vec<usize> = input_columns
                .iter()
                .filter_map(|c| columns.iter().position(|o| o == c))
                .collect();
            for row in rows {
                let mut merged = vec![String::new(); columns.len()];
                for (cell, &target) in row.into_iter().zip(&mapping) {
                    merged[target] = cell;
                }
                out.push_row(merged);
            }
        }
        Ok(out)
    }
}
