use crate::error::Result;
use crate::model::ColumnDef;

/// One row of a table, `None` for null.
pub type Record = Vec<Option<String>>;

/// The operations the loader and analytics stages need from a store.
pub trait TableStore {
    /// Replace the table `name` with exactly `rows`.
    ///
    /// Any existing table of that name is dropped first. Implementations
    /// must make the drop, create and inserts atomic, so a failure leaves
    /// the previous table in place. Returns the number of rows written.
    fn replace_table<I>(&mut self, name: &str, columns: &[ColumnDef], rows: I) -> Result<u64>
    where
        I: IntoIterator<Item = Result<Record>>;

    /// Run the statements in order as one unit of work.
    fn run_statements(&mut self, statements: &[&str]) -> Result<()>;

    fn table_exists(&self, name: &str) -> Result<bool>;

    fn row_count(&self, name: &str) -> Result<u64>;
}

/// Quote an identifier for use in SQL text.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
