use anyhow::{Context, Result};
use cinedata_core::model::{BaseTable, DerivedTable};
use cinedata_core::schema::{Database, TableInfo};
use std::path::Path;

fn print_row(name: &str, tables: &[TableInfo]) {
    match tables.iter().find(|t| t.name == name) {
        Some(info) => println!("    {:<24} {:>12} rows", info.name, info.row_count),
        None => println!("    {name:<24} {:>12}", "missing"),
    }
}

/// List base and derived tables with their row counts.
pub fn show_status(db_path: &Path) -> Result<()> {
    println!("\n📊 Cinedata Status\n");
    println!("  Database: {}", db_path.display());

    if !db_path.exists() {
        println!("\n  No database yet. Run `cinedata run` to build it.");
        return Ok(());
    }

    let db = Database::open(db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    let tables = db.list_tables()?;

    println!("\n  Base tables:");
    for table in BaseTable::ALL {
        print_row(table.table_name(), &tables);
    }

    println!("\n  Derived tables:");
    for table in DerivedTable::ALL {
        print_row(table.table_name(), &tables);
    }

    let other: Vec<&TableInfo> = tables
        .iter()
        .filter(|t| {
            !BaseTable::ALL.iter().any(|b| b.table_name() == t.name)
                && !DerivedTable::ALL.iter().any(|d| d.table_name() == t.name)
        })
        .collect();
    if !other.is_empty() {
        println!("\n  Other tables:");
        for info in other {
            println!("    {:<24} {:>12} rows", info.name, info.row_count);
        }
    }

    let derived_missing = DerivedTable::ALL
        .iter()
        .any(|d| !tables.iter().any(|t| t.name == d.table_name()));
    if derived_missing {
        println!("\n  Run `cinedata run` to build the analytics tables");
    }

    Ok(())
}
