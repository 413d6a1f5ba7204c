//! `cloudgate confirm` command implementation.

use anyhow::{Context, Result};
use std::path::Path;

use cloudgate_gate::{GateResult, process_confirmation};

use super::evaluate::print_result;
use super::read_input;

pub fn run(result_path: &Path, reply: &str, json: bool) -> Result<()> {
    let content = read_input(result_path)?;
    let pending: GateResult =
        serde_yaml::from_str(&content).context("Failed to parse saved gate result")?;

    let result = process_confirmation(&pending, reply);
    print_result(&result, json)
}
