use anyhow::Result;
use bilifans::bilibili::{BILIBILI_API_BASE, DEFAULT_TIMEOUT};
use bilifans::commands::{self, run::RunConfig};
use bilifans::data_log::DEFAULT_LOG_FILE;
use bilifans::datetime_utils::SystemClock;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "bilifans",
    version,
    about = "Log Bilibili follower counts",
    long_about = "Fetches name and follower count for a fixed list of Bilibili users and appends a timestamped record to a text log"
)]
struct Cli {
    /// Bilibili user IDs to fetch, in log order (comma-separated or repeated)
    #[arg(
        short,
        long = "mid",
        value_delimiter = ',',
        value_parser = commands::run::parse_mid,
        default_values = commands::run::DEFAULT_MIDS,
        global = true
    )]
    mids: Vec<String>,

    /// Log file to append run records to
    #[arg(short, long, env = "BILIFANS_LOG_FILE", default_value = DEFAULT_LOG_FILE, global = true)]
    log_file: PathBuf,

    /// Base URL of the Bilibili API
    #[arg(long, env = "BILIFANS_API_BASE", default_value = BILIBILI_API_BASE, global = true)]
    api_base: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "BILIFANS_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT.as_secs(), global = true)]
    timeout_secs: u64,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch every configured user once and append the results to the log (default)
    Run,

    /// Print the log file
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let args = Cli::parse();

    if args.verbose {
        debug!("Verbose mode enabled");
    }

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = RunConfig {
                mids: args.mids,
                log_path: args.log_file,
                api_base: args.api_base,
                timeout: Duration::from_secs(args.timeout_secs),
            };

            let summary = commands::run::execute(&config, &SystemClock).await?;
            if summary.persisted {
                println!("日志已保存到: {path}", path = summary.log_path.display());
            } else {
                println!(
                    "日志可能未完整保存: {path}",
                    path = summary.log_path.display()
                );
            }
        }
        Commands::Show => commands::show_log::execute(&args.log_file)?,
    }

    Ok(())
}
