//! Persistent translation cache.
//!
//! The file holds entries for every model and language ever used. A session
//! only activates the entries for its own model and target language, and
//! saving merges into whatever is on disk so other combinations survive.

use crate::extract::ExtractedString;
use crate::metrics::TranslationMetrics;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CACHE_VERSION: &str = "1.0";

/// Stable composite key. A `|` inside a field can in theory collide with
/// another key; UI text rarely contains one.
pub fn cache_key(text: &str, model: &str, target_language: &str, context: &str) -> String {
    format!("{}|{}|{}|{}", text, model, target_language, context)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub original: String,
    pub translated: String,
    pub context: String,
    pub model: String,
    pub target_language: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    version: String,
    last_updated: DateTime<Utc>,
    cache: BTreeMap<String, CacheEntry>,
}

/// One string resolved to its translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub original: String,
    pub translated: String,
    pub context: String,
    pub files: Vec<String>,
    pub from_cache: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl TranslationResult {
    pub fn new(item: &ExtractedString, translated: String, from_cache: bool) -> Self {
        Self {
            original: item.text.clone(),
            translated,
            context: item.context.clone(),
            files: item.files.clone(),
            from_cache,
            error: false,
        }
    }

    /// Passthrough used when every attempt to translate `item` failed
    pub fn failed(item: &ExtractedString) -> Self {
        Self {
            error: true,
            ..Self::new(item, item.text.clone(), false)
        }
    }
}

/// Translation cache for one model + language session
#[derive(Debug)]
pub struct TranslationCache {
    path: PathBuf,
    model: String,
    target_language: String,
    entries: BTreeMap<String, CacheEntry>,
}

impl TranslationCache {
    /// Empty in-memory cache bound to `path`
    pub fn new(path: impl Into<PathBuf>, model: &str, target_language: &str) -> Self {
        Self {
            path: path.into(),
            model: model.to_string(),
            target_language: target_language.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the entries matching `model` and `target_language`.
    ///
    /// A missing, unreadable or malformed file yields an empty cache.
    pub fn load(path: impl Into<PathBuf>, model: &str, target_language: &str) -> Self {
        let mut cache = Self::new(path, model, target_language);

        let Some(file) = read_cache_file(&cache.path) else {
            return cache;
        };

        let total = file.cache.len();
        cache.entries = file
            .cache
            .into_iter()
            .filter(|(_, entry)| entry.model == model && entry.target_language == target_language)
            .collect();

        info!(
            "Loaded {} cached translations for {} / {} ({} entries on disk)",
            cache.entries.len(),
            model,
            target_language,
            total
        );
        cache
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lookup(&self, text: &str, context: &str) -> Option<&CacheEntry> {
        let key = cache_key(text, &self.model, &self.target_language, context);
        self.entries
            .get(&key)
            .filter(|e| e.model == self.model && e.target_language == self.target_language)
    }

    /// Record a translation; an existing entry for the same key is replaced
    pub fn insert(&mut self, original: &str, translated: &str, context: &str) {
        let key = cache_key(original, &self.model, &self.target_language, context);
        self.entries.insert(
            key,
            CacheEntry {
                original: original.to_string(),
                translated: translated.to_string(),
                context: context.to_string(),
                model: self.model.clone(),
                target_language: self.target_language.clone(),
                created_at: Utc::now(),
            },
        );
    }

    /// Split `texts` into cache hits (as results) and misses. No I/O.
    pub fn partition(
        &self,
        texts: &[ExtractedString],
        metrics: &mut TranslationMetrics,
    ) -> (Vec<TranslationResult>, Vec<ExtractedString>) {
        let mut cached = Vec::new();
        let mut uncached = Vec::new();

        for item in texts {
            match self.lookup(&item.text, &item.context) {
                Some(entry) => {
                    metrics.record_cache_hit();
                    cached.push(TranslationResult::new(item, entry.translated.clone(), true));
                }
                None => {
                    metrics.record_cache_miss();
                    uncached.push(item.clone());
                }
            }
        }

        (cached, uncached)
    }

    /// Merge the in-memory entries into the file on disk and rewrite it
    pub fn save(&self) -> Result<()> {
        let mut merged = read_cache_file(&self.path)
            .map(|f| f.cache)
            .unwrap_or_default();
        for (key, entry) in &self.entries {
            merged.insert(key.clone(), entry.clone());
        }

        let file = CacheFile {
            version: CACHE_VERSION.to_string(),
            last_updated: Utc::now(),
            cache: merged,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write cache to {}", self.path.display()))?;

        debug!(
            "Saved translation cache ({} entries) to {}",
            file.cache.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn read_cache_file(path: &Path) -> Option<CacheFile> {
    if !path.exists() {
        return None;
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Failed to read cache {}: {}, starting empty", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<CacheFile>(&contents) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(
                "Cache {} is not in the expected format ({}), starting empty",
                path.display(),
                e
            );
            None
        }
    }
}
