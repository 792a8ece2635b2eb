//! Extraction stage only.
//!
//! Usage:
//!   cargo run --bin extract
//!
//! Optional:
//! - SOURCE_DIR (defaults to src)
//! - OUTPUT_DIR (defaults to .)

use anyhow::Result;
use tracing::info;
use ui_localizer::config::{Settings, EXTRACTED_TEXT_FILE};
use ui_localizer::extract::Extractor;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ui_localizer=info".parse()?),
        )
        .init();

    let settings = Settings::from_env();
    info!("Extracting texts from {}", settings.source_dir.display());

    let extraction = Extractor::new(&settings.source_dir).extract()?;
    let output = settings.artifact(EXTRACTED_TEXT_FILE);
    extraction.write(&output)?;

    println!(
        "✓ Extracted {} texts from {} files to {}",
        extraction.metadata.texts_found,
        extraction.metadata.files_processed,
        output.display()
    );
    Ok(())
}
