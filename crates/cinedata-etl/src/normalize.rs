//! Normalize stage: decompress staged tables and replace the null sentinel.

use cinedata_core::tsv::{self, TsvReader, TsvWriter};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;

use crate::config::Config;
use crate::error::{EtlError, EtlResult};
use crate::fetch::part_path;
use crate::report::{ItemReport, Reporter, StageKind, StageReport};

const COMPRESSED_SUFFIX: &str = ".gz";

/// Rows written for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Normalized {
    rows: usize,
    truncated: bool,
}

/// The Normalize stage: staged `.gz` tables become plain processed TSV.
#[derive(Debug)]
pub struct NormalizeStage {
    config: Config,
}

impl NormalizeStage {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Normalize every staged resource, continuing past unreadable files.
    ///
    /// # Errors
    /// Returns an error only if the processed directory cannot be created.
    pub fn run(&self, reporter: &dyn Reporter) -> EtlResult<StageReport> {
        let config = &self.config;
        reporter.stage_started(StageKind::Normalize);
        std::fs::create_dir_all(&config.processed_dir)
            .map_err(|e| EtlError::io(&config.processed_dir, e))?;
        let mut report = StageReport::new(StageKind::Normalize);

        for resource in &config.resources {
            let Some(output_name) = resource.strip_suffix(COMPRESSED_SUFFIX) else {
                report.record(
                    reporter,
                    ItemReport::skipped(resource, "not a compressed table"),
                );
                continue;
            };

            let source = config.staging_dir.join(resource);
            if !source.is_file() {
                report.record(reporter, ItemReport::skipped(resource, "not staged"));
                continue;
            }

            let dest = config.processed_dir.join(output_name);
            log::debug!("Normalizing {} into {}", source.display(), dest.display());
            let item = match self.normalize_file(&source, &dest) {
                Ok(Normalized {
                    rows,
                    truncated: false,
                }) => ItemReport::succeeded(resource, format!("{rows} rows")),
                Ok(Normalized {
                    rows,
                    truncated: true,
                }) => {
                    log::warn!("{} truncated to the first {} rows", resource, rows);
                    ItemReport::succeeded(
                        resource,
                        format!("{rows} rows (truncated by row limit)"),
                    )
                }
                Err(e) => ItemReport::failed(resource, e),
            };
            report.record(reporter, item);
        }

        reporter.stage_finished(&report);
        Ok(report)
    }

    fn normalize_file(&self, source: &Path, dest: &Path) -> EtlResult<Normalized> {
        let part = part_path(dest);
        let result = self.write_normalized(source, &part);
        match result {
            Ok(normalized) => {
                std::fs::rename(&part, dest).map_err(|e| EtlError::io(dest, e))?;
                Ok(normalized)
            }
            Err(e) => {
                if part.exists() {
                    if let Err(rm) = std::fs::remove_file(&part) {
                        log::warn!("Failed to remove {}: {}", part.display(), rm);
                    }
                }
                Err(e)
            }
        }
    }

    fn write_normalized(&self, source: &Path, part: &Path) -> EtlResult<Normalized> {
        let file = File::open(source).map_err(|e| EtlError::io(source, e))?;
        let mut reader = TsvReader::new(GzDecoder::new(file))?;

        let out = File::create(part).map_err(|e| EtlError::io(part, e))?;
        let mut writer = TsvWriter::new(out);
        writer.write_header(reader.header())?;

        let limit = self.config.row_limit.unwrap_or(usize::MAX);
        let mut rows = 0;
        while rows < limit {
            let Some(record) = reader.next() else { break };
            let record = record?;
            writer.write_record(record.iter().map(|field| tsv::from_sentinel(field)))?;
            rows += 1;
        }
        let truncated = rows == limit && reader.next().is_some();

        writer.into_inner()?;
        Ok(Normalized { rows, truncated })
    }
}
