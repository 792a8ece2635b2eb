//! Translation stage: cache partition, batched provider requests with a
//! per-item fallback, and the `translations.json` / `translation-mapping.json`
//! artifacts.

use crate::cache::{TranslationCache, TranslationResult};
use crate::config::{
    Config, EXTRACTED_TEXT_FILE, TRANSLATIONS_FILE, TRANSLATION_CACHE_FILE,
    TRANSLATION_MAPPING_FILE,
};
use crate::extract::{ExtractedString, Extraction};
use crate::metrics::{MetricsReport, TranslationMetrics};
use crate::openai::chat_completion;
use crate::validator::PlaceholderValidator;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

static ORDINAL_LINE: OnceLock<Regex> = OnceLock::new();

/// Build the system prompt for a numbered batch
pub fn build_batch_system_prompt(target_language: &str) -> String {
    format!(
        r#"You are a professional software localizer. Translate user interface text from English to {}.

## Rules

### Translate:
- Only text a user reads in the interface: labels, buttons, messages, tooltips, placeholders

### Keep unchanged:
- Identifiers, variable and function names
- File paths, URLs and package names
- CSS classes and technical tokens
- Placeholders and formatting tokens such as {{name}}, {{{{ value }}}}, ${{count}}, %s, %d and HTML tags

### Output format:
- Answer with one line per input, in the same numbered format: "<number>. <translation>"
- Keep the numbering of the input exactly
- No explanations, notes or commentary"#,
        target_language
    )
}

/// Build the user prompt listing `items` with 1-based ordinals
pub fn build_batch_user_prompt(items: &[ExtractedString], target_language: &str) -> String {
    let numbered = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Translate the following {} UI texts to {}:\n\n{}",
        items.len(),
        target_language,
        numbered
    )
}

/// Build the system prompt for a single string
pub fn build_single_system_prompt(target_language: &str) -> String {
    format!(
        "You are a professional software localizer. Translate the user interface text you are given from English to {}. \
Keep identifiers, paths, URLs, CSS classes, placeholders and HTML tags unchanged. \
Answer with the translation only, without quotes or commentary.",
        target_language
    )
}

pub fn build_single_user_prompt(item: &ExtractedString, target_language: &str) -> String {
    format!(
        "Translate this UI text ({}) to {}:\n\n{}",
        item.context, target_language, item.text
    )
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('「', '」')] {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim();
        }
    }
    text
}

/// Parse a numbered batch response into one slot per expected item.
///
/// Lines look like `<n>. <text>`; unlabeled lines, out-of-range ordinals and
/// empty texts are ignored, and the first line for an ordinal wins. A slot
/// without a usable line is `None`.
pub fn parse_batch_response(response: &str, expected: usize) -> Vec<Option<String>> {
    let regex = ORDINAL_LINE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*[.)]\s*(.*)$").unwrap());
    let mut slots: Vec<Option<String>> = vec![None; expected];

    for line in response.lines() {
        let Some(cap) = regex.captures(line) else {
            continue;
        };
        let Ok(ordinal) = cap[1].parse::<usize>() else {
            continue;
        };
        if ordinal == 0 || ordinal > expected || slots[ordinal - 1].is_some() {
            continue;
        }
        let text = strip_quotes(&cap[2]);
        if !text.is_empty() {
            slots[ordinal - 1] = Some(text.to_string());
        }
    }

    slots
}

/// Parse a single-item response; an empty answer is a failure
pub fn parse_single_response(response: &str) -> Result<String> {
    let text = strip_quotes(response);
    if text.is_empty() {
        anyhow::bail!("Provider returned an empty translation");
    }
    Ok(text.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationMetadata {
    pub source_file: String,
    pub translated_at: DateTime<Utc>,
    pub model: String,
    pub target_language: String,
    pub total_texts: usize,
    pub successful_translations: usize,
    pub failed_translations: usize,
    pub cached_translations: usize,
    pub metrics: MetricsReport,
}

/// Contents of `translations.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRun {
    pub metadata: TranslationMetadata,
    pub translations: Vec<TranslationResult>,
}

impl TranslationRun {
    pub fn new(
        source_file: &Path,
        config: &Config,
        translations: Vec<TranslationResult>,
        metrics: &TranslationMetrics,
    ) -> Self {
        let failed = translations.iter().filter(|t| t.error).count();
        let cached = translations.iter().filter(|t| t.from_cache).count();

        Self {
            metadata: TranslationMetadata {
                source_file: source_file.display().to_string(),
                translated_at: Utc::now(),
                model: config.openai_model.clone(),
                target_language: config.target_language.clone(),
                total_texts: translations.len(),
                successful_translations: translations.len() - failed,
                failed_translations: failed,
                cached_translations: cached,
                metrics: metrics.report(),
            },
            translations,
        }
    }

    /// original -> translated, leaving out entries that did not change
    pub fn mapping(&self) -> BTreeMap<String, String> {
        self.translations
            .iter()
            .filter(|t| t.translated != t.original)
            .map(|t| (t.original.clone(), t.translated.clone()))
            .collect()
    }

    pub fn write(&self, translations_path: &Path, mapping_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(translations_path, json).with_context(|| {
            format!("Failed to write translations to {}", translations_path.display())
        })?;

        let mapping = self.mapping();
        let json = serde_json::to_string_pretty(&mapping)?;
        fs::write(mapping_path, json).with_context(|| {
            format!("Failed to write mapping to {}", mapping_path.display())
        })?;

        info!(
            "Wrote {} translations ({} mapped) to {}",
            self.translations.len(),
            mapping.len(),
            translations_path.display()
        );
        Ok(())
    }
}

/// Drives one translation run against the provider
pub struct Translator {
    client: reqwest::Client,
    config: Config,
    cache: TranslationCache,
    metrics: TranslationMetrics,
}

impl Translator {
    /// Translator with the cache file under the configured output directory
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;
        let cache = TranslationCache::load(
            config.settings.artifact(TRANSLATION_CACHE_FILE),
            &config.openai_model,
            &config.target_language,
        );
        Ok(Self::with_cache(client, config, cache))
    }

    pub fn with_cache(client: reqwest::Client, config: Config, cache: TranslationCache) -> Self {
        Self {
            client,
            config,
            cache,
            metrics: TranslationMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &TranslationMetrics {
        &self.metrics
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Translate every text, returning results in input order.
    ///
    /// Provider failures never abort the run; only cache writes can fail it.
    pub async fn translate_all(
        &mut self,
        texts: &[ExtractedString],
    ) -> Result<Vec<TranslationResult>> {
        let (cached, uncached) = self.cache.partition(texts, &mut self.metrics);
        info!(
            "{} texts: {} from cache, {} to translate",
            texts.len(),
            cached.len(),
            uncached.len()
        );

        let mut results = cached;
        let batch_size = self.config.batch_size.max(1);
        let batch_count = uncached.len().div_ceil(batch_size);

        for (index, batch) in uncached.chunks(batch_size).enumerate() {
            if index > 0 && !self.config.batch_delay.is_zero() {
                sleep(self.config.batch_delay).await;
            }
            info!(
                "Translating batch {}/{} ({} texts)",
                index + 1,
                batch_count,
                batch.len()
            );

            let translated = self.translate_batch(batch).await;
            results.extend(translated);
            self.cache.save()?;
        }

        self.cache.save()?;

        let mut by_text: HashMap<String, TranslationResult> = results
            .into_iter()
            .map(|r| (r.original.clone(), r))
            .collect();
        Ok(texts
            .iter()
            .filter_map(|t| by_text.remove(&t.text))
            .collect())
    }

    async fn translate_batch(&mut self, batch: &[ExtractedString]) -> Vec<TranslationResult> {
        let language = self.config.target_language.clone();
        let system = build_batch_system_prompt(&language);
        let user = build_batch_user_prompt(batch, &language);

        self.metrics.record_api_call();
        let outcome = chat_completion(&self.client, &self.config, &system, &user).await;
        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_api_failure();
                self.metrics.record_batch_fallback();
                warn!(
                    "Batch request failed ({:#}), translating {} texts individually",
                    e,
                    batch.len()
                );
                return self.translate_individually(batch).await;
            }
        };

        let slots = parse_batch_response(&response, batch.len());
        let mut results = Vec::with_capacity(batch.len());
        let mut padded = 0;

        for (item, slot) in batch.iter().zip(slots) {
            match slot {
                Some(translated) => results.push(self.accept(item, translated)),
                None => {
                    padded += 1;
                    debug!("No translation returned for {:?}, keeping original", item.text);
                    results.push(TranslationResult::new(item, item.text.clone(), false));
                }
            }
        }

        if padded > 0 {
            self.metrics.record_padded_items(padded);
            debug!("Padded {} of {} batch items with originals", padded, batch.len());
        }

        results
    }

    async fn translate_individually(&mut self, batch: &[ExtractedString]) -> Vec<TranslationResult> {
        let mut results = Vec::with_capacity(batch.len());

        for (index, item) in batch.iter().enumerate() {
            if index > 0 && !self.config.item_delay.is_zero() {
                sleep(self.config.item_delay).await;
            }
            results.push(self.translate_single(item).await);
        }

        results
    }

    async fn translate_single(&mut self, item: &ExtractedString) -> TranslationResult {
        let language = self.config.target_language.clone();
        let system = build_single_system_prompt(&language);
        let user = build_single_user_prompt(item, &language);

        self.metrics.record_api_call();
        let translated = chat_completion(&self.client, &self.config, &system, &user)
            .await
            .and_then(|response| parse_single_response(&response));

        match translated {
            Ok(translated) => self.accept(item, translated),
            Err(e) => {
                self.metrics.record_api_failure();
                warn!("Failed to translate {:?}: {:#}", item.text, e);
                TranslationResult::failed(item)
            }
        }
    }

    /// Validate a provider translation and record it in the cache.
    ///
    /// A translation with validation errors is neither cached nor mapped;
    /// the item is reported as failed and keeps its original text.
    fn accept(&mut self, item: &ExtractedString, translated: String) -> TranslationResult {
        let validation = PlaceholderValidator::validate(&item.text, &translated);
        if validation.has_errors() {
            warn!(
                "Rejected translation {:?} for {:?}: {:?}",
                translated, item.text, validation.errors
            );
            return TranslationResult::failed(item);
        }
        if validation.has_warnings() {
            warn!(
                "Translation validation warnings for {:?}: {:?}",
                item.text, validation.warnings
            );
        }
        self.cache.insert(&item.text, &translated, &item.context);
        TranslationResult::new(item, translated, false)
    }
}

/// Run the whole stage: read `extracted-text.json`, translate, write artifacts
pub async fn translate_extraction(config: &Config) -> Result<TranslationRun> {
    let settings = &config.settings;
    let extraction_path = settings.artifact(EXTRACTED_TEXT_FILE);
    let extraction = Extraction::load(&extraction_path)?;

    info!(
        "Translating {} texts to {} with {}",
        extraction.texts.len(),
        config.target_language,
        config.openai_model
    );

    let mut translator = Translator::new(config.clone())?;
    let translations = translator.translate_all(&extraction.texts).await?;
    let run = TranslationRun::new(
        &extraction_path,
        config,
        translations,
        translator.metrics(),
    );

    run.write(
        &settings.artifact(TRANSLATIONS_FILE),
        &settings.artifact(TRANSLATION_MAPPING_FILE),
    )?;
    Ok(run)
}
