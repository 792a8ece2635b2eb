//! Translation stage only. Reads `extracted-text.json` from OUTPUT_DIR.
//!
//! Usage:
//!   cargo run --bin translate
//!
//! Required environment variables:
//! - OPENAI_API_KEY
//!
//! Optional:
//! - OPENAI_MODEL (defaults to gpt-4o-mini)
//! - OPENAI_BASE_URL (defaults to https://api.openai.com/v1)
//! - TARGET_LANGUAGE (defaults to Simplified Chinese)
//! - TRANSLATION_BATCH_SIZE (defaults to 10)
//! - TRANSLATION_BATCH_DELAY_MS (defaults to 1000)
//! - TRANSLATION_ITEM_DELAY_MS (defaults to 200)

use anyhow::Result;
use ui_localizer::config::Config;
use ui_localizer::translation::translate_extraction;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ui_localizer=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let run = translate_extraction(&config).await?;

    let meta = &run.metadata;
    let metrics = &meta.metrics;
    println!("✓ Translated {} texts to {}", meta.total_texts, meta.target_language);
    println!("  Successful:   {}", meta.successful_translations);
    println!("  Failed:       {}", meta.failed_translations);
    println!(
        "  From cache:   {} ({:.1}% hit rate)",
        meta.cached_translations, metrics.cache_hit_rate
    );
    println!(
        "  API calls:    {} ({} failed, {} batch fallbacks)",
        metrics.api_calls, metrics.api_failures, metrics.batch_fallbacks
    );
    println!("  Mapped texts: {}", run.mapping().len());
    Ok(())
}
