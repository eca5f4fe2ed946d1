use anyhow::{Context, Result};
use cinedata_core::model::BaseTable;
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for cinedata.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (CINEDATA_* prefix)
/// 3. Config file (~/.config/cinedata/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL prefix the resources are downloaded from.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Resource filenames to fetch, relative to `base_url`.
    #[serde(default = "default_resources")]
    pub resources: Vec<String>,

    /// Where downloaded resources are kept.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Where normalized tables are written.
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,

    /// Path to the SQLite database.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: CINEDATA_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Maximum number of data rows normalized per resource.
    ///
    /// Unset means the whole table. A limit truncates every table silently
    /// from the store's point of view, so each truncation is reported.
    #[serde(default)]
    pub row_limit: Option<usize>,

    /// Upper bound on one resource download, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logger settings applied once at startup by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_coloured")]
    pub coloured: bool,

    /// Write the log to this file instead of the terminal.
    ///
    /// Can be set via:
    /// - ENV: CINEDATA_LOGGING_FILE
    /// - Config: `file = "cinedata.log"` under `[logging]`
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            coloured: default_coloured(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            resources: default_resources(),
            staging_dir: default_staging_dir(),
            processed_dir: default_processed_dir(),
            database_path: default_db_path(),
            row_limit: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/cinedata/config.toml
    /// Reads environment variables with CINEDATA_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("cinedata");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Point staging and processed directories under one data directory.
    ///
    /// This is used when the --data-dir CLI flag is provided.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.processed_dir = data_dir.join("processed");
        self.staging_dir = data_dir;
        self
    }

    /// Full download URL of one resource.
    #[must_use]
    pub fn resource_url(&self, resource: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, resource)
        } else {
            format!("{}/{}", self.base_url, resource)
        }
    }
}

fn default_base_url() -> String {
    String::from("https://datasets.imdbws.com/")
}

fn default_resources() -> Vec<String> {
    BaseTable::ALL
        .iter()
        .map(|t| t.resource().to_string())
        .collect()
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_processed_dir() -> PathBuf {
    default_staging_dir().join("processed")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("imdb_data.db")
}

const fn default_fetch_timeout_secs() -> u64 {
    1800
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_coloured() -> bool {
    true
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/cinedata/config.toml
/// - macOS: ~/Library/Application Support/cinedata/config.toml
/// - Windows: %APPDATA%\cinedata\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cinedata")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Cinedata Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (CINEDATA_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Where the dataset snapshots are downloaded from
base_url = "https://datasets.imdbws.com/"

# Snapshots to download; each becomes one table named after the file
resources = [
    "name.basics.tsv.gz",
    "title.akas.tsv.gz",
    "title.basics.tsv.gz",
    "title.crew.tsv.gz",
    "title.episode.tsv.gz",
    "title.principals.tsv.gz",
    "title.ratings.tsv.gz",
]

# Downloaded snapshots and normalized tables
# (CLI: cinedata run --data-dir DIR sets both)
staging_dir = "data"
processed_dir = "data/processed"

# Path to the SQLite database
#
# Can also be set via:
# - CLI: cinedata run --db /custom/path.db
# - Environment: CINEDATA_DATABASE_PATH=/custom/path.db
database_path = "imdb_data.db"

# Read at most this many rows of each snapshot. Leave unset to load
# everything; set a small value for quick experiments.
#row_limit = 1000

# Give up on a download after this many seconds
fetch_timeout_secs = 1800

[logging]
level = "info"
coloured = true

# Write the log to a file instead of stderr
#file = "cinedata.log"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
