//! Diagnostic command to check installation.

use azlaunch_core::config::IssueSeverity;
use azlaunch_core::Config;
use azlaunch_store::{Collection, RecordStore, SqliteRecordStore};

pub async fn run(config: &Config) -> anyhow::Result<()> {
    println!("Running diagnostics...\n");

    // Check config directory
    let config_file = Config::config_dir().join("config.toml");
    println!("Config file: {:?}", config_file);
    if config_file.exists() {
        println!("  ✓ Exists");
    } else {
        println!("  ✗ Does not exist (defaults are used)");
    }

    // Check configuration values
    let validation = config.validate();
    if validation.issues.is_empty() {
        println!("  ✓ Valid");
    }
    for issue in &validation.issues {
        let mark = match issue.severity {
            IssueSeverity::Error => "✗",
            IssueSeverity::Warning => "!",
        };
        println!("  {} {}: {}", mark, issue.field, issue.message);
    }

    // Check data directory
    let data_dir = config.data_dir();
    println!("\nData directory: {:?}", data_dir);
    if data_dir.exists() {
        println!("  ✓ Exists");
    } else {
        println!("  ✗ Does not exist (will be created on first use)");
    }

    // Check record store
    println!("\nRecord store:");
    match SqliteRecordStore::new(&data_dir) {
        Ok(store) => {
            if let Some(path) = store.path() {
                println!("  ✓ Opened {:?}", path);
            }
            for collection in Collection::ALL {
                match store.count(collection).await {
                    Ok(count) => println!("    {:<18} {}", collection.as_str(), count),
                    Err(e) => println!("    {:<18} ✗ {}", collection.as_str(), e),
                }
            }
        }
        Err(e) => {
            println!("  ✗ Failed to open: {}", e);
        }
    }

    // Authentication server
    println!("\nAuthentication:");
    println!("  Server: {}", config.auth.base_url());
    println!(
        "  Mode: {}",
        if config.auth.online { "online" } else { "offline" }
    );
    println!(
        "  Email verification: {}",
        if config.auth.email_verified {
            "required"
        } else {
            "not required"
        }
    );

    println!("\nDiagnostics complete.");
    Ok(())
}
