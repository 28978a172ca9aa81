// src/table/storage.rs

//! Table persistence.
//!
//! Works never share tables in memory; each one reads its inputs from disk
//! and writes its output to the path it was assigned. [`Storage`] is the seam
//! that makes this swappable in tests.

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::Table;

/// Abstract table storage.
pub trait Storage: Send + Sync + Debug {
    fn read_table(&self, path: &Path) -> Result<Table>;
    fn write_table(&self, table: &Table, path: &Path) -> Result<()>;
}

/// Tab-separated files with a single header row.
#[derive(Debug, Clone, Default)]
pub struct TsvStorage;

impl Storage for TsvStorage {
    fn read_table(&self, path: &Path) -> Result<Table> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading table {:?}", path))?;

        if contents.is_empty() {
            bail!("table {:?} has no header row", path);
        }

        // Only the terminating newline is dropped; a blank line is a row of
        // empty cells.
        let body = contents.strip_suffix('\n').unwrap_or(&contents);
        let mut lines = body.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        let header = match lines.next() {
            Some(h) if !h.is_empty() => h,
            _ => bail!("table {:?} has no header row", path),
        };

        let mut table = Table::new(header.split('\t'));
        let width = table.columns().len();

        for (lineno, line) in lines.enumerate() {
            let cells: Vec<String> = line.split('\t').map(str::to_string).collect();
            if cells.len() > width {
                bail!(
                    "table {:?} row {} has {} cells but the header has {}",
                    path,
                    lineno + 2,
                    cells.len(),
                    width
                );
            }
            table.push_row(cells);
        }

        Ok(table)
    }

    fn write_table(&self, table: &Table, path: &Path) -> Result<()> {
        let mut out = String::new();
        out.push_str(&table.columns().join("\t"));
        out.push('\n');
        for row in table.rows() {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        fs::write(path, out).with_context(|| format!("writing table {:?}", path))
    }
}
