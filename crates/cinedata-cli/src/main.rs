use anyhow::{Context, Result};
use cinedata_etl::config::LoggingConfig;
use cinedata_etl::Config;
use clap::Parser;
use std::path::{Path, PathBuf};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "cinedata", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: imdb_data.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Run the full ETL pipeline
    ///
    /// Runs four stages in order:
    ///
    /// - Fetch: download each dataset snapshot that is not already staged
    /// - Normalize: decompress each snapshot and turn `\N` into real nulls
    /// - Load: replace one table per normalized file in the database
    /// - Analyze: rebuild title_analytics and participants_analytics
    ///
    /// A failure on one file is reported and the run moves on; later stages
    /// work with whatever input exists. The summary at the end lists every
    /// file that did not make it into the database.
    Run {
        /// Directory for downloaded and normalized files (default: data)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Read at most this many rows of each snapshot
        #[arg(long)]
        row_limit: Option<usize>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,

        /// Exit with an error if any file failed
        #[arg(long)]
        strict: bool,
    },
    /// Show which tables are in the database
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults if it does not exist
    Init,
}

/// Logger options for the configured level and destination.
///
/// The log never goes to stdout, which belongs to command output
/// (`run --json` in particular).
fn logger_opts(logging: &LoggingConfig) -> Result<twyg::Opts> {
    let level = match logging.level.to_lowercase().as_str() {
        "trace" => twyg::LogLevel::Trace,
        "debug" => twyg::LogLevel::Debug,
        "warn" | "warning" => twyg::LogLevel::Warn,
        "error" => twyg::LogLevel::Error,
        _ => twyg::LogLevel::Info,
    };
    let (output, coloured) = match &logging.file {
        Some(path) => (twyg::Output::File(path.clone()), false),
        None => (twyg::Output::Stderr, logging.coloured),
    };
    twyg::OptsBuilder::new()
        .coloured(coloured)
        .level(level)
        .output(output)
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid logging options: {e}"))
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    if let Some(parent) = logging.file.as_deref().and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    twyg::setup(logger_opts(logging)?)
        .map_err(|e| anyhow::anyhow!("Failed to set up logging: {e}"))?;
    Ok(())
}

async fn dispatch(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Run {
            data_dir,
            row_limit,
            json,
            strict,
        } => {
            if let Some(data_dir) = data_dir {
                config = config.with_data_dir(data_dir);
            }
            if row_limit.is_some() {
                config.row_limit = row_limit;
            }
            commands::run_pipeline(config, json, strict).await?;
        }
        Commands::Status => {
            commands::show_status(&config.database_path)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config)?,
            ConfigAction::Path => commands::config::show_path()?,
            ConfigAction::Example => commands::config::show_example()?,
            ConfigAction::Init => commands::config::init_config()?,
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    init_logging(&config.logging)?;

    let result = dispatch(cli.command, config).await;
    log::logger().flush();
    result
}
