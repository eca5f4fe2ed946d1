use anyhow::Result;
use cinedata_etl::{config, Config};

/// Show the effective configuration, after env vars and CLI flags.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    let path = config::config_file_path();
    println!("Config file: {}", path.display());
    println!(
        "File exists: {}\n",
        if path.exists() { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    println!("  base_url: {}", config.base_url);
    println!("  resources:");
    for resource in &config.resources {
        println!("    - {resource}");
    }
    println!("  staging_dir: {}", config.staging_dir.display());
    println!("  processed_dir: {}", config.processed_dir.display());
    println!("  database_path: {}", config.database_path.display());
    match config.row_limit {
        Some(limit) => println!("  row_limit: {limit}"),
        None => println!("  row_limit: <not set>"),
    }
    println!("  fetch_timeout_secs: {}", config.fetch_timeout_secs);
    println!("  logging.level: {}", config.logging.level);
    println!("  logging.coloured: {}", config.logging.coloured);

    println!("\nPriority: CLI args > ENV vars (CINEDATA_*) > Config file > Defaults");

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure cinedata.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
