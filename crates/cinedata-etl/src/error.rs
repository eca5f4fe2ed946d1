//! Error types for the ETL pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running pipeline stages.
#[derive(Debug, Error)]
pub enum EtlError {
    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// An error propagated from the store or the TSV codec.
    #[error(transparent)]
    Core(#[from] cinedata_core::Error),

    /// A base table the analytics stage joins over has not been loaded.
    #[error("base table {0} is missing; cannot build derived tables")]
    MissingTable(String),

    /// The processed directory could not be listed.
    #[error("cannot list {}: {source}", path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl EtlError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for pipeline results.
pub type EtlResult<T> = std::result::Result<T, EtlError>;
