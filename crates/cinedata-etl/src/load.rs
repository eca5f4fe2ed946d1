//! Load stage: every processed table becomes a store table of the same name.

use cinedata_core::model::ColumnDef;
use cinedata_core::schema::{Record, TableStore};
use cinedata_core::tsv::{self, TsvReader};
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{EtlError, EtlResult};
use crate::report::{ItemReport, Reporter, StageKind, StageReport};

const PROCESSED_EXTENSION: &str = ".tsv";

// The pattern is a literal, so compilation cannot fail.
#[allow(clippy::expect_used)]
static NON_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^A-Za-z0-9_]").expect("identifier pattern is valid"));

/// Derive the store table name for a processed file.
///
/// The extension is dropped and every character that is not a letter,
/// digit, or underscore becomes an underscore, so `name.basics.tsv` loads
/// as `name_basics`.
#[must_use]
pub fn table_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    NON_IDENTIFIER.replace_all(&stem, "_").into_owned()
}

/// The Load stage: replace one table per processed file.
#[derive(Debug)]
pub struct LoadStage {
    processed_dir: PathBuf,
}

impl LoadStage {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            processed_dir: config.processed_dir.clone(),
        }
    }

    /// Load every `.tsv` file in the processed directory.
    ///
    /// Files that cannot be read or parsed are reported and skipped. A
    /// failure writing to the store ends the stage; tables loaded before it
    /// stay in place.
    ///
    /// # Errors
    /// Returns an error if the processed directory cannot be listed or the
    /// store rejects a write.
    pub fn run<S: TableStore>(
        &self,
        store: &mut S,
        reporter: &dyn Reporter,
    ) -> EtlResult<StageReport> {
        reporter.stage_started(StageKind::Load);
        let mut report = StageReport::new(StageKind::Load);
        let mut loaded_from: HashMap<String, String> = HashMap::new();

        for path in self.processed_files()? {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let table = table_name(&file_name);

            let columns = match infer_columns(&path) {
                Ok(columns) => columns,
                Err(e) => {
                    report.record(reporter, ItemReport::failed(&file_name, e));
                    continue;
                }
            };
            let rows = match open_records(&path) {
                Ok(rows) => rows,
                Err(e) => {
                    report.record(reporter, ItemReport::failed(&file_name, e));
                    continue;
                }
            };

            if let Some(previous) = loaded_from.insert(table.clone(), file_name.clone()) {
                log::warn!(
                    "{} and {} both load into table {}; keeping {}",
                    previous,
                    file_name,
                    table,
                    file_name
                );
            }

            let count = store.replace_table(&table, &columns, rows)?;
            report.record(
                reporter,
                ItemReport::succeeded(&file_name, format!("{count} rows into {table}")),
            );
        }

        reporter.stage_finished(&report);
        Ok(report)
    }

    fn processed_files(&self) -> EtlResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.processed_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| EtlError::Listing {
                path: self.processed_dir.clone(),
                source,
            })?;
            let is_table = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(PROCESSED_EXTENSION));
            if entry.file_type().is_file() && is_table {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

fn open_reader(path: &Path) -> EtlResult<TsvReader<File>> {
    let file = File::open(path).map_err(|e| EtlError::io(path, e))?;
    Ok(TsvReader::new(file)?)
}

/// Read the whole file once, validating every row and inferring types.
fn infer_columns(path: &Path) -> EtlResult<Vec<ColumnDef>> {
    let reader = open_reader(path)?;
    let mut columns: Vec<ColumnDef> = reader.header().iter().map(ColumnDef::new).collect();
    for record in reader {
        for (column, field) in columns.iter_mut().zip(record?) {
            column.observe(tsv::from_empty(&field));
        }
    }
    Ok(columns)
}

fn open_records(path: &Path) -> EtlResult<impl Iterator<Item = cinedata_core::Result<Record>>> {
    let reader = open_reader(path)?;
    Ok(reader.map(|record| {
        record.map(|fields| {
            fields
                .into_iter()
                .map(|f| if f.is_empty() { None } else { Some(f) })
                .collect()
        })
    }))
}
