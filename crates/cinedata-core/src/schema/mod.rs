//! The SQLite table store.

pub mod db;
pub mod store;

pub use db::{Database, TableInfo};
pub use store::{quote_identifier, Record, TableStore};
