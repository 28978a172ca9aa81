#![allow(dead_code)]

use std::path::{Path, PathBuf};

use shaperdag::table::{Storage, Table, TsvStorage};

pub use shaperdag_test_utils::builders;
pub use shaperdag_test_utils::{init_tracing, with_timeout};

/// Small benchmark table in the shape the parsers produce.
pub fn stats_table() -> Table {
    Table::from_rows(
        &["benchmark", "config", "ipc", "cycles"],
        &[
            &["mcf", "base", "1", "200"],
            &["mcf", "tx", "2", "100"],
            &["lbm", "base", "4", "50"],
            &["lbm", "tx", "8", "100"],
        ],
    )
}

/// Write [`stats_table`] as TSV into `dir` and return its path.
pub fn write_stats(dir: &Path) -> PathBuf {
    let path = dir.join("stats.tsv");
    TsvStorage
        .write_table(&stats_table(), &path)
        .expect("write source table");
    path
}

/// Number of entries directly inside `dir`.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
