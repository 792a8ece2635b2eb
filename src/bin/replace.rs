//! Replacement stage only. Reads `translation-mapping.json` from OUTPUT_DIR.
//!
//! Usage:
//!   cargo run --bin replace                 # Back up and rewrite SOURCE_DIR
//!   cargo run --bin replace -- --dry-run    # Report without writing
//!   cargo run --bin replace -- --restore    # Put the backup back in place

use anyhow::Result;
use tracing::info;
use ui_localizer::config::Settings;
use ui_localizer::replace::{replace_sources, Replacer};

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ui_localizer=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let settings = Settings::from_env();

    if args.iter().any(|arg| arg == "--restore") {
        let replacer = Replacer::new(&settings);
        info!("Restoring from {}", replacer.backup_dir().display());
        replacer.restore()?;
        println!("✓ Restored {}", settings.source_dir.display());
        return Ok(());
    }

    let dry_run = args.iter().any(|arg| arg == "--dry-run");
    let report = replace_sources(&settings, dry_run)?;
    let meta = &report.metadata;

    println!(
        "✓ {} {} occurrences in {} of {} files",
        if dry_run { "Would replace" } else { "Replaced" },
        meta.total_replacements,
        meta.files_modified,
        meta.files_scanned
    );
    println!(
        "  Mappings: {} valid, {} invalid",
        meta.valid_mappings, meta.invalid_mappings
    );
    if !dry_run {
        println!("  Backup:   {}", meta.backup_dir);
    }
    Ok(())
}
