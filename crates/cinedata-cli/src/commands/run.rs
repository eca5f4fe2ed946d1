use anyhow::{Context, Result};
use cinedata_etl::{
    Config, HttpFetcher, ItemReport, ItemStatus, LogReporter, Pipeline, Reporter, StageKind,
    StageReport,
};
use std::time::Duration;

/// Prints stage progress to the terminal as the run goes.
#[derive(Debug, Default)]
struct ConsoleReporter;

impl ConsoleReporter {
    const fn icon(stage: StageKind) -> &'static str {
        match stage {
            StageKind::Fetch => "📥",
            StageKind::Normalize => "🧹",
            StageKind::Load => "🗄️ ",
            StageKind::Analyze => "📊",
        }
    }
}

impl Reporter for ConsoleReporter {
    fn stage_started(&self, stage: StageKind) {
        log::debug!("Stage {} started", stage);
        println!("{} [{}] Starting...", Self::icon(stage), stage);
    }

    fn item(&self, stage: StageKind, item: &ItemReport) {
        match item.status {
            ItemStatus::Succeeded => println!("  ✓ {} ({})", item.name, item.detail),
            ItemStatus::Skipped => println!("  - {} skipped: {}", item.name, item.detail),
            ItemStatus::Failed => {
                log::error!("[{}] {} failed: {}", stage, item.name, item.detail);
                println!("  ✗ {} FAILED: {}", item.name, item.detail);
            }
        }
    }

    fn stage_finished(&self, report: &StageReport) {
        println!(
            "  [{}] Complete: {} ok, {} skipped, {} failed\n",
            report.stage,
            report.succeeded(),
            report.skipped(),
            report.failed()
        );
    }
}

/// Run fetch → normalize → load → analyze and print the summary.
///
/// With `json`, progress goes to the log only and stdout carries nothing but
/// the summary document. With `strict`, any failed item is an error.
pub async fn run_pipeline(config: Config, json: bool, strict: bool) -> Result<()> {
    if !json {
        println!("\n🎬 Cinedata ETL Pipeline\n");
        println!("  Source: {}", config.base_url);
        println!("  Data directory: {}", config.staging_dir.display());
        println!("  Database: {}", config.database_path.display());
        if let Some(limit) = config.row_limit {
            println!("  Row limit: {limit}");
        }
        println!();
    }

    let fetcher = HttpFetcher::new(Duration::from_secs(config.fetch_timeout_secs))
        .context("Failed to create HTTP client")?;
    let reporter: &dyn Reporter = if json { &LogReporter } else { &ConsoleReporter };

    let summary = Pipeline::new(config)
        .run(&fetcher, reporter)
        .await
        .context("Pipeline execution failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }

    if strict && summary.failed() > 0 {
        anyhow::bail!("Run finished with {} failed item(s)", summary.failed());
    }

    Ok(())
}
