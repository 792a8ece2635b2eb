use crate::error::PipelineError;
use crate::retry::RetryConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const EXTRACTED_TEXT_FILE: &str = "extracted-text.json";
pub const TRANSLATION_CACHE_FILE: &str = "translation-cache.json";
pub const TRANSLATIONS_FILE: &str = "translations.json";
pub const TRANSLATION_MAPPING_FILE: &str = "translation-mapping.json";
pub const REPLACEMENT_REPORT_FILE: &str = "replacement-report.json";
pub const REPLACEMENT_SUMMARY_FILE: &str = "replacement-summary.md";

/// Paths shared by every stage. Needs no credentials.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the application source tree
    pub source_dir: PathBuf,
    /// Directory the JSON artifacts are written to
    pub output_dir: PathBuf,
    /// Suffix appended to the source directory name for the backup copy
    pub backup_suffix: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            source_dir: std::env::var("SOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("src")),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            backup_suffix: std::env::var("BACKUP_SUFFIX")
                .unwrap_or_else(|_| "-backup".to_string()),
        }
    }

    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            backup_suffix: "-backup".to_string(),
        }
    }

    pub fn artifact(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    /// Sibling of the source directory, e.g. `app/src` -> `app/src-backup`
    pub fn backup_dir(&self) -> PathBuf {
        backup_dir_for(&self.source_dir, &self.backup_suffix)
    }
}

/// Resolves `source_dir` first so `.` or `src/..` name their real directory.
/// A path that does not exist yet is used as given.
pub fn backup_dir_for(source_dir: &Path, suffix: &str) -> PathBuf {
    let source_dir = source_dir
        .canonicalize()
        .unwrap_or_else(|_| source_dir.to_path_buf());
    let name = source_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    source_dir.with_file_name(format!("{}{}", name, suffix))
}

/// Configuration for the translate stage.
#[derive(Debug, Clone)]
pub struct Config {
    // OpenAI
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub openai_temperature: f32,

    // Translation
    pub target_language: String,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub item_delay: Duration,
    pub retry: RetryConfig,

    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(PipelineError::MissingCredential("OPENAI_API_KEY"))?;

        let batch_size: usize = match std::env::var("TRANSLATION_BATCH_SIZE") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("Invalid TRANSLATION_BATCH_SIZE: {}", v))?,
            Err(_) => 10,
        };
        if batch_size == 0 {
            anyhow::bail!("TRANSLATION_BATCH_SIZE must be at least 1");
        }

        Ok(Self {
            openai_api_key,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_temperature: std::env::var("OPENAI_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.3),

            target_language: std::env::var("TARGET_LANGUAGE")
                .unwrap_or_else(|_| "Simplified Chinese".to_string()),
            batch_size,
            batch_delay: Duration::from_millis(
                std::env::var("TRANSLATION_BATCH_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1000),
            ),
            item_delay: Duration::from_millis(
                std::env::var("TRANSLATION_ITEM_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(200),
            ),
            retry: RetryConfig::provider_call(),

            settings: Settings::from_env(),
        })
    }

    /// Chat completion endpoint derived from the base URL
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.openai_base_url.trim_end_matches('/')
        )
    }
}
