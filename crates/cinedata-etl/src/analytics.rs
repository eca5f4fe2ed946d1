//! Analytics stage: rebuild the derived tables from the loaded base tables.
//!
//! Both derived tables are dropped and recreated with `CREATE TABLE ... AS
//! SELECT` on every run. The four statements execute as one store
//! transaction, so a failed rebuild leaves the previous derived tables
//! untouched.

use cinedata_core::model::{BaseTable, DerivedTable};
use cinedata_core::schema::TableStore;

use crate::error::{EtlError, EtlResult};
use crate::report::{ItemReport, Reporter, StageKind, StageReport};

const DROP_TITLE_ANALYTICS: &str = "DROP TABLE IF EXISTS title_analytics";

const DROP_PARTICIPANTS_ANALYTICS: &str = "DROP TABLE IF EXISTS participants_analytics";

/// One row per title, with its rating and the number of distinct people
/// credited on it. Titles without credits count zero participants.
const CREATE_TITLE_ANALYTICS: &str = r#"
CREATE TABLE title_analytics AS

WITH participants AS (
    SELECT
        tconst,
        COUNT(DISTINCT nconst) AS qtParticipants
    FROM title_principals
    GROUP BY tconst
)

SELECT
    tb.tconst,
    tb.titleType,
    tb.originalTitle,
    tb.startYear,
    tb.endYear,
    tb.genres,
    tr.averageRating,
    tr.numVotes,
    COALESCE(tp.qtParticipants, 0) AS qtParticipants

FROM title_basics tb

LEFT JOIN title_ratings tr
    ON tr.tconst = tb.tconst

LEFT JOIN participants tp
    ON tp.tconst = tb.tconst
"#;

/// One row per credit, with the credited title's genres.
const CREATE_PARTICIPANTS_ANALYTICS: &str = r#"
CREATE TABLE participants_analytics AS

SELECT
    tp.nconst,
    tp.tconst,
    tp.ordering,
    tp.category,
    tb.genres

FROM title_principals tp

LEFT JOIN title_basics tb
    ON tb.tconst = tp.tconst
"#;

const REBUILD: [&str; 4] = [
    DROP_TITLE_ANALYTICS,
    DROP_PARTICIPANTS_ANALYTICS,
    CREATE_TITLE_ANALYTICS,
    CREATE_PARTICIPANTS_ANALYTICS,
];

/// The Analytics stage: recreate `title_analytics` and
/// `participants_analytics`.
#[derive(Debug, Default)]
pub struct AnalyticsStage;

impl AnalyticsStage {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Rebuild both derived tables.
    ///
    /// # Errors
    /// Returns [`EtlError::MissingTable`] if a joined base table has not
    /// been loaded, or the store error if the rebuild fails.
    pub fn run<S: TableStore>(
        &self,
        store: &mut S,
        reporter: &dyn Reporter,
    ) -> EtlResult<StageReport> {
        reporter.stage_started(StageKind::Analyze);

        for table in BaseTable::ALL.into_iter().filter(|t| t.is_joined()) {
            if !store.table_exists(table.table_name())? {
                return Err(EtlError::MissingTable(table.table_name().to_string()));
            }
        }

        log::info!("Saving analytical tables to the database...");
        store.run_statements(&REBUILD)?;

        let mut report = StageReport::new(StageKind::Analyze);
        for table in DerivedTable::ALL {
            let rows = store.row_count(table.table_name())?;
            report.record(
                reporter,
                ItemReport::succeeded(table.table_name(), format!("{rows} rows")),
            );
        }

        reporter.stage_finished(&report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::LogReporter;
    use cinedata_core::schema::Database;
    use rusqlite::types::Value;

    const BASICS: &str = "CREATE TABLE title_basics (
        tconst TEXT, titleType TEXT, primaryTitle TEXT, originalTitle TEXT,
        isAdult INTEGER, startYear INTEGER, endYear INTEGER,
        runtimeMinutes INTEGER, genres TEXT)";
    const RATINGS: &str =
        "CREATE TABLE title_ratings (tconst TEXT, averageRating REAL, numVotes INTEGER)";
    const PRINCIPALS: &str = "CREATE TABLE title_principals (
        tconst TEXT, ordering INTEGER, nconst TEXT, category TEXT,
        job TEXT, characters TEXT)";

    fn base_tables() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.run_statements(&[BASICS, RATINGS, PRINCIPALS]).unwrap();
        db
    }

    fn dump(db: &Database, table: &str) -> Vec<Vec<Value>> {
        let mut stmt = db
            .conn()
            .prepare(&format!("SELECT * FROM {table} ORDER BY 1, 2, 3"))
            .unwrap();
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        rows
    }

    #[test]
    fn test_title_without_rating_counts_participants() {
        let mut db = base_tables();
        db.run_statements(&[
            "INSERT INTO title_basics VALUES
                ('t1', 'movie', 'A', 'A', 0, 2000, NULL, 90, 'Drama')",
            "INSERT INTO title_principals VALUES
                ('t1', 1, 'n1', 'actor', NULL, NULL),
                ('t1', 2, 'n2', 'director', NULL, NULL)",
        ])
        .unwrap();

        AnalyticsStage::new().run(&mut db, &LogReporter).unwrap();

        let (rating, votes, participants): (Option<f64>, Option<i64>, i64) = db
            .conn()
            .query_row(
                "SELECT averageRating, numVotes, qtParticipants
                 FROM title_analytics WHERE tconst = 't1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(rating, None);
        assert_eq!(votes, None);
        assert_eq!(participants, 2);
    }

    #[test]
    fn test_every_title_appears_exactly_once() {
        let mut db = base_tables();
        db.run_statements(&[
            "INSERT INTO title_basics (tconst, genres) VALUES
                ('t1', 'Drama'), ('t2', 'Comedy'), ('t3', NULL)",
            "INSERT INTO title_ratings VALUES ('t1', 7.5, 100)",
            "INSERT INTO title_principals (tconst, ordering, nconst) VALUES
                ('t1', 1, 'n1'), ('t1', 2, 'n1'), ('t1', 3, 'n2'),
                ('t2', 1, 'n3'),
                ('t9', 1, 'n4')",
        ])
        .unwrap();

        AnalyticsStage::new().run(&mut db, &LogReporter).unwrap();

        let rows: Vec<(String, Option<f64>, i64)> = {
            let mut stmt = db
                .conn()
                .prepare(
                    "SELECT tconst, averageRating, qtParticipants
                     FROM title_analytics ORDER BY tconst",
                )
                .unwrap();
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
                .unwrap()
                .collect::<rusqlite::Result<Vec<_>>>()
                .unwrap();
            rows
        };
        assert_eq!(
            rows,
            vec![
                ("t1".to_string(), Some(7.5), 2),
                ("t2".to_string(), None, 1),
                ("t3".to_string(), None, 0),
            ]
        );
    }

    #[test]
    fn test_participants_carry_genres() {
        let mut db = base_tables();
        db.run_statements(&[
            "INSERT INTO title_basics (tconst, genres) VALUES ('t1', 'Drama,Romance')",
            "INSERT INTO title_principals (tconst, ordering, nconst, category) VALUES
                ('t1', 1, 'n1', 'actor'),
                ('t1', 2, 'n2', 'actress'),
                ('t9', 1, 'n1', 'self')",
        ])
        .unwrap();

        let report = AnalyticsStage::new().run(&mut db, &LogReporter).unwrap();

        assert_eq!(report.item("participants_analytics").unwrap().detail, "3 rows");
        let rows = dump(&db, "participants_analytics");
        assert_eq!(
            rows,
            vec![
                vec![
                    Value::Text("n1".into()),
                    Value::Text("t1".into()),
                    Value::Integer(1),
                    Value::Text("actor".into()),
                    Value::Text("Drama,Romance".into()),
                ],
                vec![
                    Value::Text("n1".into()),
                    Value::Text("t9".into()),
                    Value::Integer(1),
                    Value::Text("self".into()),
                    Value::Null,
                ],
                vec![
                    Value::Text("n2".into()),
                    Value::Text("t1".into()),
                    Value::Integer(2),
                    Value::Text("actress".into()),
                    Value::Text("Drama,Romance".into()),
                ],
            ]
        );
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut db = base_tables();
        db.run_statements(&[
            "INSERT INTO title_basics (tconst, titleType, genres, startYear) VALUES
                ('t1', 'movie', 'Drama', 2000), ('t2', 'short', NULL, 1895)",
            "INSERT INTO title_ratings VALUES ('t2', 5.7, 2003)",
            "INSERT INTO title_principals (tconst, ordering, nconst) VALUES ('t1', 1, 'n1')",
        ])
        .unwrap();
        let stage = AnalyticsStage::new();

        stage.run(&mut db, &LogReporter).unwrap();
        let first = (dump(&db, "title_analytics"), dump(&db, "participants_analytics"));
        stage.run(&mut db, &LogReporter).unwrap();
        let second = (dump(&db, "title_analytics"), dump(&db, "participants_analytics"));

        assert_eq!(first, second);
        assert_eq!(db.row_count("title_analytics").unwrap(), 2);
    }

    #[test]
    fn test_rebuild_reflects_latest_load() {
        let mut db = base_tables();
        db.run_statements(&["INSERT INTO title_basics (tconst) VALUES ('t1')"])
            .unwrap();
        let stage = AnalyticsStage::new();
        stage.run(&mut db, &LogReporter).unwrap();

        db.run_statements(&["INSERT INTO title_basics (tconst) VALUES ('t2')"])
            .unwrap();
        stage.run(&mut db, &LogReporter).unwrap();

        assert_eq!(db.row_count("title_analytics").unwrap(), 2);
    }

    #[test]
    fn test_missing_base_table_is_reported() {
        let mut db = Database::open_in_memory().unwrap();
        db.run_statements(&[BASICS, RATINGS]).unwrap();

        let result = AnalyticsStage::new().run(&mut db, &LogReporter);

        match result {
            Err(EtlError::MissingTable(name)) => assert_eq!(name, "title_principals"),
            other => panic!("expected missing table, got {other:?}"),
        }
        assert!(!db.table_exists("title_analytics").unwrap());
    }
}
