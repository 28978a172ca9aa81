// tests/integration/main.rs

#[path = "../common/mod.rs"]
mod common;

mod concurrency;
mod config_loading;
mod error_handling;
mod pipeline_run;
