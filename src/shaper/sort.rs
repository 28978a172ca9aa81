// src/shaper/sort.rs

//! Categorical sort.
//!
//! Rows are ordered by each listed column in turn, following the value order
//! given for that column. Values that are not listed sort after listed ones
//! and keep their relative order (the sort is stable).

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Shaper, ShaperError, parse_params, require_column, single_input};
use crate::table::Table;

pub const KIND: &str = "sort";

#[derive(Debug, Deserialize)]
struct Params {
    order_dict: Map<String, Value>,
}

#[derive(Debug)]
pub struct Sort {
    orders: Vec<(String, Vec<String>)>,
}

pub fn build(params: &Value) -> Result<Box<dyn Shaper>, ShaperError> {
    let p: Params = parse_params(KIND, params)?;
    if p.order_dict.is_empty() {
        return Err(ShaperError::InvalidParams {
            kind: KIND.to_string(),
            reason: "'order_dict' must name at least one column".to_string(),
        });
    }

    let mut orders = Vec::with_capacity(p.order_dict.len());
    for (column, values) in p.order_dict {
        let values: Vec<Value> = match values {
            Value::Array(items) => items,
            _ => {
                return Err(ShaperError::InvalidParams {
                    kind: KIND.to_string(),
                    reason: format!("sort order for column '{column}' must be a list"),
                });
            }
        };
        let values = values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        orders.push((column, values));
    }

    Ok(Box::new(Sort { orders }))
}

impl Shaper for Sort {
    fn apply(&self, inputs: Vec<Table>) -> Result<Table, ShaperError> {
        let mut table = single_input(KIND, inputs)?;

        let keys = self
            .orders
            .iter()
            .map(|(column, order)| Ok((require_column(KIND, &table, column)?, order)))
            .collect::<Result<Vec<_>, ShaperError>>()?;

        let rank = |row: &[String]| -> Vec<usize> {
            keys.iter()
                .map(|(col, order)| {
                    order
                        .iter()
                        .position(|v| *v == row[*col])
                        .unwrap_or(order.len())
                })
                .collect()
        };

        table.rows_mut().sort_by_cached_key(|row| rank(row));
        Ok(table)
    }
}
