//! Extraction stage: walk the source tree and collect translatable strings.
//!
//! Components contribute their template zone and every script zone; plain
//! script files only go through the script harvester. Every candidate is run
//! through [`is_translatable_text`] and merged by exact text.

mod filter;
mod script;
mod template;

pub use filter::{is_translatable_text, MIN_TEXT_LENGTH};
pub use script::{PatternScanStrategy, ScriptHarvester, ScriptStrategy, SyntaxTreeStrategy};
pub use template::{harvest_template, ComponentZones, ScriptZone, TEXT_ATTRIBUTES};

use crate::error::PipelineError;
use crate::source_tree::{relative_path, source_files, SourceKind};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A raw string found in one place, before filtering and merging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub context: String,
}

impl Candidate {
    pub fn new(text: &str, context: &str) -> Self {
        Self {
            text: text.to_string(),
            context: context.to_string(),
        }
    }
}

/// A translatable string and every file it was seen in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedString {
    pub text: String,
    pub context: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub source_dir: String,
    pub extracted_at: DateTime<Utc>,
    pub files_processed: usize,
    pub texts_found: usize,
}

/// Contents of `extracted-text.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub metadata: ExtractionMetadata,
    pub texts: Vec<ExtractedString>,
}

impl Extraction {
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write extraction output to {}", path.display()))?;
        info!("Wrote {} texts to {}", self.texts.len(), path.display());
        Ok(())
    }

    /// Load a previous extraction; a missing file is a fatal precondition
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::ExtractionNotFound(path.to_path_buf()).into());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Case-folded ordering with a code-point tie-break, so "Apple" < "apple" < "Banana"
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Walks a source tree and collects [`ExtractedString`]s
pub struct Extractor {
    source_dir: PathBuf,
    harvester: ScriptHarvester,
}

impl Extractor {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            harvester: ScriptHarvester::new(),
        }
    }

    pub fn with_harvester(mut self, harvester: ScriptHarvester) -> Self {
        self.harvester = harvester;
        self
    }

    pub fn extract(&mut self) -> Result<Extraction> {
        if !self.source_dir.is_dir() {
            return Err(PipelineError::DirectoryNotFound(self.source_dir.clone()).into());
        }

        info!("Extracting texts from {}", self.source_dir.display());

        let mut merged: HashMap<String, ExtractedString> = HashMap::new();
        let mut files_processed = 0;

        for (path, kind) in source_files(&self.source_dir) {
            let relative = relative_path(&self.source_dir, &path);

            let candidates = match self.harvest_file(&path, kind, &relative) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("Skipping {}: {:#}", relative, e);
                    continue;
                }
            };
            files_processed += 1;

            let mut kept = 0;
            for candidate in candidates {
                if !is_translatable_text(&candidate.text) {
                    continue;
                }
                kept += 1;
                let entry = merged
                    .entry(candidate.text.clone())
                    .or_insert_with(|| ExtractedString {
                        text: candidate.text,
                        context: candidate.context,
                        files: Vec::new(),
                    });
                if !entry.files.contains(&relative) {
                    entry.files.push(relative.clone());
                }
            }
            debug!("{}: {} translatable candidates", relative, kept);
        }

        let mut texts: Vec<ExtractedString> = merged.into_values().collect();
        texts.sort_by(|a, b| compare_text(&a.text, &b.text));

        info!(
            "Processed {} files, found {} unique texts",
            files_processed,
            texts.len()
        );

        Ok(Extraction {
            metadata: ExtractionMetadata {
                source_dir: self.source_dir.display().to_string(),
                extracted_at: Utc::now(),
                files_processed,
                texts_found: texts.len(),
            },
            texts,
        })
    }

    fn harvest_file(
        &mut self,
        path: &Path,
        kind: SourceKind,
        origin: &str,
    ) -> Result<Vec<Candidate>> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        match kind {
            SourceKind::Component => {
                let zones = ComponentZones::split(&source);
                let mut candidates = zones
                    .template
                    .as_deref()
                    .map(harvest_template)
                    .unwrap_or_default();
                for zone in &zones.scripts {
                    candidates.extend(self.harvester.harvest(&zone.content, zone.kind, origin)?);
                }
                Ok(candidates)
            }
            _ => self.harvester.harvest(&source, kind, origin),
        }
    }
}
