//! ETL pipeline stages for cinedata.
//!
//! Implements the fetch, normalize, load, and analytics stages over the
//! IMDb dataset snapshots, and the pipeline that runs them in order and
//! rolls their per-item reports into a run summary.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod analytics;
pub mod config;
pub mod error;
pub mod fetch;
pub mod load;
pub mod normalize;
pub mod pipeline;
pub mod report;

pub use analytics::AnalyticsStage;
pub use config::Config;
pub use error::{EtlError, EtlResult};
pub use fetch::{FetchStage, Fetcher, HttpFetcher};
pub use load::LoadStage;
pub use normalize::NormalizeStage;
pub use pipeline::Pipeline;
pub use report::{
    ItemReport, ItemStatus, LogReporter, Reporter, RunSummary, StageKind, StageReport,
};
