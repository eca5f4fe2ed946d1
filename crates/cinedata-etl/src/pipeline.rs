//! The pipeline: the four stages run in order over one configuration.

use chrono::Utc;
use cinedata_core::schema::Database;

use crate::analytics::AnalyticsStage;
use crate::config::Config;
use crate::error::{EtlError, EtlResult};
use crate::fetch::{FetchStage, Fetcher};
use crate::load::LoadStage;
use crate::normalize::NormalizeStage;
use crate::report::{Reporter, RunSummary};

/// Runs fetch → normalize → load → analyze, strictly in that order.
///
/// Per-item failures are recorded in the stage reports and never stop the
/// next stage; it simply works with whatever input exists. Stage-wide
/// failures (directories, store access) end the run with an error.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all four stages.
    ///
    /// The store connection is opened for load and analyze only and is
    /// closed before this returns, on success or error.
    ///
    /// # Errors
    /// Returns the first stage-wide failure.
    pub async fn run(
        &self,
        fetcher: &dyn Fetcher,
        reporter: &dyn Reporter,
    ) -> EtlResult<RunSummary> {
        let started_at = Utc::now();
        let mut stages = Vec::with_capacity(4);

        stages.push(FetchStage::new(&self.config).run(fetcher, reporter).await?);
        stages.push(NormalizeStage::new(&self.config).run(reporter)?);

        {
            let mut db = self.open_store()?;
            stages.push(LoadStage::new(&self.config).run(&mut db, reporter)?);
            stages.push(AnalyticsStage::new().run(&mut db, reporter)?);
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            stages,
        };
        log::info!("End of ETL process");
        Ok(summary)
    }

    fn open_store(&self) -> EtlResult<Database> {
        let path = &self.config.database_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| EtlError::io(parent, e))?;
        }
        log::debug!("Opening database {}", path.display());
        Ok(Database::open(path)?)
    }
}
