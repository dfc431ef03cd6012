//! Append-only, human-readable run log.
//!
//! One block is appended per run; existing content is never rewritten.

use crate::bilibili::FetchOutcome;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Default log file name, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "bilibili_data_log.txt";

/// Written once when the log file is first created
pub const LOG_HEADER: &str = "B站用户数据抓取日志\n记录格式: [抓取时间] 用户名 | 粉丝数 | UID\n\n";

pub const STATUS_ALL_SUCCEEDED: &str = "状态: 全部成功";
pub const STATUS_PARTIAL_FAILURE: &str = "状态: 部分失败";

const SEPARATOR_WIDTH: usize = 50;

/// Failure to persist an entry block. The block may be partially written.
#[derive(Debug, Error)]
#[error("Failed to write log file {}: {source}", .path.display())]
pub struct LogWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// The record of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub lines: Vec<String>,
    pub all_succeeded: bool,
}

impl LogEntry {
    /// Build an entry from outcomes, preserving their order
    pub fn from_outcomes(timestamp: &str, outcomes: &[FetchOutcome]) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            lines: outcomes.iter().map(format_outcome_line).collect(),
            all_succeeded: outcomes.iter().all(FetchOutcome::is_success),
        }
    }

    pub fn status_line(&self) -> &'static str {
        if self.all_succeeded {
            STATUS_ALL_SUCCEEDED
        } else {
            STATUS_PARTIAL_FAILURE
        }
    }

    /// Render the entry block, without a trailing newline
    pub fn render(&self) -> String {
        let mut block = format!("[{timestamp}] 抓取记录", timestamp = self.timestamp);
        for line in &self.lines {
            block.push('\n');
            block.push_str(line);
        }
        block.push('\n');
        block.push_str(self.status_line());
        block.push('\n');
        block.push_str(&"-".repeat(SEPARATOR_WIDTH));
        block
    }
}

/// Format the log line for a single outcome
pub fn format_outcome_line(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Fetched(record) => format!(
            "✓ 用户名: {name} | 粉丝数: {fans} | UID: {mid}",
            name = record.name,
            fans = record.fans,
            mid = record.mid
        ),
        FetchOutcome::Failed { mid, error } => format!("✗ UID: {mid} | 错误: {error}"),
    }
}

/// Append `block` to the log at `path`, creating the file with [`LOG_HEADER`]
/// if it does not exist yet. Returns the path written to.
pub fn append_entry(path: &Path, block: &str) -> Result<PathBuf, LogWriteError> {
    let to_error = |source: io::Error| LogWriteError {
        path: path.to_path_buf(),
        source,
    };

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(LOG_HEADER.as_bytes()).map_err(to_error)?;
            info!("Created log file {path}", path = path.display());
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
        Err(e) => return Err(to_error(e)),
    }

    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(to_error)?;
    file.write_all(format!("{block}\n").as_bytes())
        .map_err(to_error)?;
    file.flush().map_err(to_error)?;

    debug!(
        "Appended {bytes} bytes to {path}",
        bytes = block.len() + 1,
        path = path.display()
    );

    Ok(path.to_path_buf())
}

/// Read the whole log, or `None` if nothing has been logged yet
pub fn read_log(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| {
            format!("Failed to read log file {path}", path = path.display())
        }),
    }
}
