//! Full localization pipeline: extract, translate, replace.
//!
//! Usage:
//!   cargo run                            # Run every stage
//!   cargo run -- --dry-run               # Report replacements without writing
//!   cargo run -- --skip-replace          # Stop after translation
//!
//! Required environment variables:
//! - OPENAI_API_KEY
//!
//! Optional:
//! - SOURCE_DIR (defaults to src)
//! - OUTPUT_DIR (defaults to .)
//! - OPENAI_MODEL (defaults to gpt-4o-mini)
//! - OPENAI_BASE_URL (defaults to https://api.openai.com/v1)
//! - TARGET_LANGUAGE (defaults to Simplified Chinese)

use anyhow::Result;
use tracing::info;
use ui_localizer::config::{Config, EXTRACTED_TEXT_FILE};
use ui_localizer::extract::Extractor;
use ui_localizer::replace::replace_sources;
use ui_localizer::translation::translate_extraction;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ui_localizer=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let dry_run = args.iter().any(|arg| arg == "--dry-run");
    let skip_replace = args.iter().any(|arg| arg == "--skip-replace");

    // Fail on a missing key before doing any work
    let config = Config::from_env()?;
    let settings = &config.settings;

    info!("Step 1/3: extracting texts from {}", settings.source_dir.display());
    let extraction = Extractor::new(&settings.source_dir).extract()?;
    extraction.write(&settings.artifact(EXTRACTED_TEXT_FILE))?;
    println!(
        "Extracted {} texts from {} files",
        extraction.metadata.texts_found, extraction.metadata.files_processed
    );

    info!("Step 2/3: translating to {}", config.target_language);
    let run = translate_extraction(&config).await?;
    let meta = &run.metadata;
    println!(
        "Translated {} texts: {} ok ({} cached), {} failed",
        meta.total_texts,
        meta.successful_translations,
        meta.cached_translations,
        meta.failed_translations
    );

    if skip_replace {
        info!("Skipping replacement");
        return Ok(());
    }

    info!("Step 3/3: replacing texts in {}", settings.source_dir.display());
    let report = replace_sources(settings, dry_run)?;
    println!(
        "{} {} occurrences in {} files{}",
        if dry_run { "Would replace" } else { "Replaced" },
        report.metadata.total_replacements,
        report.metadata.files_modified,
        if dry_run { " (dry run)" } else { "" }
    );
    if !dry_run {
        println!("Backup: {}", report.metadata.backup_dir);
    }

    Ok(())
}
