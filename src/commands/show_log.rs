use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::data_log;

/// Print the run log to stdout without touching it
pub fn execute(log_path: &Path) -> Result<()> {
    match data_log::read_log(log_path)? {
        Some(content) => print!("{content}"),
        None => info!(
            "No log file at {path} yet; run a fetch first",
            path = log_path.display()
        ),
    }

    Ok(())
}
