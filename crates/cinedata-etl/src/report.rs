//! Per-item completion reports and the run rollup.
//!
//! Every stage returns a [`StageReport`] listing what happened to each
//! resource, file, or table it handled. Stages also announce progress
//! through a [`Reporter`] passed in by the caller, so nothing here depends
//! on how (or whether) a global logger is configured.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Fetch,
    Normalize,
    Load,
    Analyze,
}

impl StageKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Normalize => "normalize",
            Self::Load => "load",
            Self::Analyze => "analyze",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Succeeded,
    Skipped,
    Failed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Succeeded => "ok",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        })
    }
}

/// What happened to one resource, file, or table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub name: String,
    pub status: ItemStatus,
    pub detail: String,
}

impl ItemReport {
    pub fn succeeded(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, ItemStatus::Succeeded, detail)
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, ItemStatus::Skipped, reason)
    }

    pub fn failed(name: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::new(name, ItemStatus::Failed, error.to_string())
    }

    fn new(name: impl Into<String>, status: ItemStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
        }
    }
}

/// Receives progress from running stages.
pub trait Reporter: fmt::Debug + Send + Sync {
    fn stage_started(&self, stage: StageKind);

    fn item(&self, stage: StageKind, item: &ItemReport);

    fn stage_finished(&self, report: &StageReport);
}

/// Forwards progress to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn stage_started(&self, stage: StageKind) {
        log::info!("Starting {} stage", stage);
    }

    fn item(&self, stage: StageKind, item: &ItemReport) {
        match item.status {
            ItemStatus::Succeeded => log::info!("[{}] {}: {}", stage, item.name, item.detail),
            ItemStatus::Skipped => log::info!("[{}] {} skipped: {}", stage, item.name, item.detail),
            ItemStatus::Failed => log::error!("[{}] {} failed: {}", stage, item.name, item.detail),
        }
    }

    fn stage_finished(&self, report: &StageReport) {
        log::info!(
            "{} stage finished: {} ok, {} skipped, {} failed",
            report.stage,
            report.succeeded(),
            report.skipped(),
            report.failed()
        );
    }
}

/// The outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub items: Vec<ItemReport>,
}

impl StageReport {
    #[must_use]
    pub const fn new(stage: StageKind) -> Self {
        Self {
            stage,
            items: Vec::new(),
        }
    }

    /// Append an item and announce it.
    pub fn record(&mut self, reporter: &dyn Reporter, item: ItemReport) {
        reporter.item(self.stage, &item);
        self.items.push(item);
    }

    #[must_use]
    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(ItemStatus::Succeeded)
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(ItemStatus::Skipped)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(ItemStatus::Failed)
    }

    #[must_use]
    pub fn item(&self, name: &str) -> Option<&ItemReport> {
        self.items.iter().find(|i| i.name == name)
    }
}

/// The rollup of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
}

impl RunSummary {
    #[must_use]
    pub fn stage(&self, stage: StageKind) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.stages.iter().map(StageReport::failed).sum()
    }

    /// Items that did not succeed in some stage, excluding downloads that
    /// were skipped because the resource was already staged.
    #[must_use]
    pub fn gaps(&self) -> Vec<(StageKind, &ItemReport)> {
        self.stages
            .iter()
            .flat_map(|s| s.items.iter().map(move |i| (s.stage, i)))
            .filter(|(stage, item)| match item.status {
                ItemStatus::Succeeded => false,
                ItemStatus::Failed => true,
                ItemStatus::Skipped => *stage != StageKind::Fetch,
            })
            .collect()
    }

    /// `true` when every item of every stage was handled without gaps.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.gaps().is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(
            f,
            "Run finished in {:.1}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        )?;
        for stage in &self.stages {
            writeln!(
                f,
                "  {:<10} {} ok, {} skipped, {} failed",
                stage.stage,
                stage.succeeded(),
                stage.skipped(),
                stage.failed()
            )?;
        }
        let gaps = self.gaps();
        if !gaps.is_empty() {
            writeln!(f, "Incomplete data:")?;
            for (stage, item) in gaps {
                writeln!(f, "  [{stage}] {} {}: {}", item.name, item.status, item.detail)?;
            }
        }
        Ok(())
    }
}
