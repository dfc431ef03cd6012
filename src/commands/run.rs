use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::bilibili::{BilibiliClient, FetchOutcome, BILIBILI_API_BASE, DEFAULT_TIMEOUT};
use crate::data_log::{self, LogEntry, DEFAULT_LOG_FILE};
use crate::datetime_utils::{format_for_display, Clock};

/// Users tracked when no `--mid` is given
pub const DEFAULT_MIDS: [&str; 2] = ["173276266", "640584333"];

/// Configuration for a single run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mids: Vec<String>,
    pub log_path: PathBuf,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mids: DEFAULT_MIDS.iter().map(|mid| mid.to_string()).collect(),
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
            api_base: BILIBILI_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// What a run produced
#[derive(Debug)]
pub struct RunSummary {
    pub log_path: PathBuf,
    pub outcomes: Vec<FetchOutcome>,
    pub all_succeeded: bool,
    /// False when appending the entry failed; the log may hold a partial block
    pub persisted: bool,
}

/// Fetch every configured user once and append the run to the log
pub async fn execute(config: &RunConfig, clock: &dyn Clock) -> Result<RunSummary> {
    let client = BilibiliClient::new(&config.api_base, config.timeout)
        .context("Failed to initialize Bilibili client")?;

    Ok(run_with_client(&client, &config.mids, &config.log_path, clock).await)
}

/// Drive one run with an already constructed client
pub async fn run_with_client(
    client: &BilibiliClient,
    mids: &[String],
    log_path: &Path,
    clock: &dyn Clock,
) -> RunSummary {
    let timestamp = format_for_display(&clock.now());
    info!(
        "Starting run for {count} users at {timestamp}",
        count = mids.len()
    );

    let mut outcomes = Vec::with_capacity(mids.len());
    for mid in mids {
        let outcome = client.fetch_user(mid).await;
        println!("{}", format_progress_line(&outcome, &timestamp));
        outcomes.push(outcome);
    }

    let entry = LogEntry::from_outcomes(&timestamp, &outcomes);
    let persisted = match data_log::append_entry(log_path, &entry.render()) {
        Ok(path) => {
            info!("Appended run to {path}", path = path.display());
            true
        }
        Err(e) => {
            error!("{e}");
            eprintln!("写入日志失败: {e}");
            false
        }
    };

    RunSummary {
        log_path: log_path.to_path_buf(),
        all_succeeded: entry.all_succeeded,
        outcomes,
        persisted,
    }
}

/// Validate one user ID from the command line: trimmed, non-empty, digits only
pub fn parse_mid(raw: &str) -> Result<String> {
    let mid = raw.trim();
    if mid.is_empty() {
        bail!("user ID must not be empty");
    }
    if !mid.chars().all(|c| c.is_ascii_digit()) {
        bail!("user ID must be numeric, got {mid:?}");
    }
    Ok(mid.to_string())
}

/// Progress line printed to stdout for one outcome
pub fn format_progress_line(outcome: &FetchOutcome, timestamp: &str) -> String {
    match outcome {
        FetchOutcome::Fetched(record) => format!(
            "用户信息: {name} (UID {mid}) 粉丝数 {fans}, 抓取时间: {timestamp}",
            name = record.name,
            mid = record.mid,
            fans = record.fans
        ),
        FetchOutcome::Failed { mid, error } => format!("抓取失败: UID {mid}: {error}"),
    }
}
