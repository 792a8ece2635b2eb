//! Replacement stage: back up the source tree, then rewrite every literal
//! occurrence of each mapped original with its translation.

use crate::config::{
    Settings, REPLACEMENT_REPORT_FILE, REPLACEMENT_SUMMARY_FILE, TRANSLATION_MAPPING_FILE,
};
use crate::error::PipelineError;
use crate::source_tree::{copy_tree, relative_path, source_files_except};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Raw contents of `translation-mapping.json`
pub type RawMapping = BTreeMap<String, serde_json::Value>;

/// Outcome of [`Replacer::ensure_backup`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStatus {
    /// Fresh copy with this many files
    Created(usize),
    /// An existing backup was left untouched
    Reused,
    /// Dry runs never touch the disk
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRecord {
    pub original: String,
    pub translated: String,
    pub occurrences: usize,
}

/// Every key replaced in one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub file: String,
    /// Occurrences replaced across all `changes`
    pub replacements: usize,
    pub changes: Vec<ReplacementRecord>,
}

impl FileChange {
    pub fn new(file: String, changes: Vec<ReplacementRecord>) -> Self {
        Self {
            file,
            replacements: changes.iter().map(|c| c.occurrences).sum(),
            changes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementMetadata {
    pub source_dir: String,
    pub backup_dir: String,
    pub replaced_at: DateTime<Utc>,
    pub dry_run: bool,
    pub total_mappings: usize,
    pub valid_mappings: usize,
    pub invalid_mappings: usize,
    pub files_scanned: usize,
    pub files_modified: usize,
    pub total_replacements: usize,
}

/// Contents of `replacement-report.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementReport {
    pub metadata: ReplacementMetadata,
    pub changes: Vec<FileChange>,
}

impl ReplacementReport {
    pub fn write(&self, json_path: &Path, markdown_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(json_path, json)
            .with_context(|| format!("Failed to write report to {}", json_path.display()))?;
        fs::write(markdown_path, self.to_markdown())
            .with_context(|| format!("Failed to write summary to {}", markdown_path.display()))?;
        info!(
            "Wrote replacement report to {} and {}",
            json_path.display(),
            markdown_path.display()
        );
        Ok(())
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.render_markdown(&mut out);
        out
    }

    fn render_markdown(&self, out: &mut String) -> fmt::Result {
        let m = &self.metadata;

        writeln!(out, "# Text Replacement Summary\n")?;
        if m.dry_run {
            writeln!(out, "> Dry run: no files were modified.\n")?;
        }
        writeln!(out, "| Item | Value |")?;
        writeln!(out, "| --- | --- |")?;
        writeln!(out, "| Source directory | `{}` |", m.source_dir)?;
        writeln!(out, "| Backup directory | `{}` |", m.backup_dir)?;
        writeln!(out, "| Replaced at | {} |", m.replaced_at.to_rfc3339())?;
        writeln!(
            out,
            "| Mappings used | {} of {} ({} invalid) |",
            m.valid_mappings, m.total_mappings, m.invalid_mappings
        )?;
        writeln!(out, "| Files scanned | {} |", m.files_scanned)?;
        writeln!(out, "| Files modified | {} |", m.files_modified)?;
        writeln!(out, "| Total replacements | {} |\n", m.total_replacements)?;

        writeln!(out, "## Changes\n")?;
        if self.changes.is_empty() {
            writeln!(out, "No occurrences were found.\n")?;
        }
        for file in &self.changes {
            writeln!(out, "### `{}` ({})\n", file.file, file.replacements)?;
            for c in &file.changes {
                writeln!(out, "- \"{}\" → \"{}\" ×{}", c.original, c.translated, c.occurrences)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "## Restore\n")?;
        writeln!(out, "To restore the original sources, run:\n")?;
        writeln!(out, "```sh\ncargo run --bin replace -- --restore\n```\n")?;
        writeln!(out, "or manually:\n")?;
        writeln!(
            out,
            "```sh\nrm -rf \"{src}\" && mv \"{backup}\" \"{src}\"\n```",
            src = m.source_dir,
            backup = m.backup_dir
        )
    }
}

/// Keep entries whose key and value are both non-empty strings that differ.
///
/// Returns the valid pairs, longest key first with a lexicographic
/// tie-break, and the number of dropped entries.
pub fn validate_mapping(raw: &RawMapping) -> (Vec<(String, String)>, usize) {
    let mut valid = Vec::new();
    let mut invalid = 0;

    for (original, value) in raw {
        let translated = match value.as_str() {
            Some(t) => t,
            None => {
                invalid += 1;
                continue;
            }
        };
        if original.trim().is_empty() || translated.trim().is_empty() || original == translated {
            invalid += 1;
            continue;
        }
        valid.push((original.clone(), translated.to_string()));
    }

    valid.sort_by(|(a, _), (b, _)| {
        Reverse(a.chars().count())
            .cmp(&Reverse(b.chars().count()))
            .then_with(|| a.cmp(b))
    });

    if invalid > 0 {
        warn!("Dropped {} invalid mapping entries", invalid);
    }
    (valid, invalid)
}

/// Rewrites a source tree from a translation mapping
#[derive(Debug, Clone)]
pub struct Replacer {
    source_dir: PathBuf,
    backup_dir: PathBuf,
    dry_run: bool,
}

impl Replacer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            source_dir: settings.source_dir.clone(),
            backup_dir: settings.backup_dir(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn load_mapping(path: &Path) -> Result<RawMapping> {
        if !path.exists() {
            return Err(PipelineError::MappingNotFound(path.to_path_buf()).into());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Refuse a backup directory inside the source tree, e.g. from an
    /// unresolvable source path or a suffix containing a separator.
    fn check_backup_location(&self) -> Result<()> {
        let source = self
            .source_dir
            .canonicalize()
            .unwrap_or_else(|_| self.source_dir.clone());
        let backup = self
            .backup_dir
            .canonicalize()
            .unwrap_or_else(|_| self.backup_dir.clone());
        if backup.starts_with(&source) {
            anyhow::bail!(
                "Backup directory {} lies inside source directory {}; choose another BACKUP_SUFFIX or SOURCE_DIR",
                self.backup_dir.display(),
                self.source_dir.display()
            );
        }
        Ok(())
    }

    /// Copy the source tree to the backup directory unless one already exists
    pub fn ensure_backup(&self) -> Result<BackupStatus> {
        self.check_backup_location()?;
        if self.dry_run {
            return Ok(BackupStatus::Skipped);
        }
        if self.backup_dir.exists() {
            info!(
                "Backup {} already exists, leaving it untouched",
                self.backup_dir.display()
            );
            return Ok(BackupStatus::Reused);
        }

        let copied = copy_tree(&self.source_dir, &self.backup_dir)?;
        info!("Backed up {} files to {}", copied, self.backup_dir.display());
        Ok(BackupStatus::Created(copied))
    }

    /// Replace every occurrence of each key, in the order given.
    ///
    /// Per-file I/O failures and per-key pattern failures are logged and
    /// skipped.
    pub fn apply(&self, mapping: &[(String, String)]) -> Result<ReplacementReport> {
        if !self.source_dir.is_dir() {
            return Err(PipelineError::DirectoryNotFound(self.source_dir.clone()).into());
        }

        let mut changes = Vec::new();
        let mut files_scanned = 0;

        for (path, _) in source_files_except(&self.source_dir, &self.backup_dir) {
            let relative = relative_path(&self.source_dir, &path);
            let mut content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping {}: {}", relative, e);
                    continue;
                }
            };
            files_scanned += 1;

            let mut records = Vec::new();
            for (original, translated) in mapping {
                let pattern = match Regex::new(&regex::escape(original)) {
                    Ok(pattern) => pattern,
                    Err(e) => {
                        warn!("{}: skipping {:?}: {}", relative, original, e);
                        continue;
                    }
                };
                let occurrences = pattern.find_iter(&content).count();
                if occurrences == 0 {
                    continue;
                }
                content = pattern
                    .replace_all(&content, NoExpand(translated))
                    .into_owned();
                records.push(ReplacementRecord {
                    original: original.clone(),
                    translated: translated.clone(),
                    occurrences,
                });
            }

            if records.is_empty() {
                continue;
            }

            if !self.dry_run {
                if let Err(e) = fs::write(&path, &content) {
                    warn!("Failed to write {}: {}", relative, e);
                    continue;
                }
            }
            let change = FileChange::new(relative, records);
            debug!(
                "{}: {} occurrences of {} keys",
                change.file,
                change.replacements,
                change.changes.len()
            );
            changes.push(change);
        }

        let total_replacements = changes.iter().map(|c| c.replacements).sum();
        info!(
            "{} {} occurrences in {} of {} files",
            if self.dry_run { "Would replace" } else { "Replaced" },
            total_replacements,
            changes.len(),
            files_scanned
        );

        Ok(ReplacementReport {
            metadata: ReplacementMetadata {
                source_dir: self.source_dir.display().to_string(),
                backup_dir: self.backup_dir.display().to_string(),
                replaced_at: Utc::now(),
                dry_run: self.dry_run,
                total_mappings: mapping.len(),
                valid_mappings: mapping.len(),
                invalid_mappings: 0,
                files_scanned,
                files_modified: changes.len(),
                total_replacements,
            },
            changes,
        })
    }

    /// Replace the source tree with its backup
    pub fn restore(&self) -> Result<()> {
        if !self.backup_dir.is_dir() {
            return Err(PipelineError::BackupNotFound(self.backup_dir.clone()).into());
        }
        if self.source_dir.exists() {
            fs::remove_dir_all(&self.source_dir)
                .with_context(|| format!("Failed to remove {}", self.source_dir.display()))?;
        }
        fs::rename(&self.backup_dir, &self.source_dir).with_context(|| {
            format!(
                "Failed to move {} to {}",
                self.backup_dir.display(),
                self.source_dir.display()
            )
        })?;
        info!(
            "Restored {} from {}",
            self.source_dir.display(),
            self.backup_dir.display()
        );
        Ok(())
    }
}

/// Run the whole stage: load and validate the mapping, back up, replace and
/// write the report.
pub fn replace_sources(settings: &Settings, dry_run: bool) -> Result<ReplacementReport> {
    let raw = Replacer::load_mapping(&settings.artifact(TRANSLATION_MAPPING_FILE))?;
    let (mapping, invalid) = validate_mapping(&raw);
    info!("{} valid mappings, {} invalid", mapping.len(), invalid);

    let replacer = Replacer::new(settings).with_dry_run(dry_run);
    if !settings.source_dir.is_dir() {
        return Err(PipelineError::DirectoryNotFound(settings.source_dir.clone()).into());
    }
    replacer.ensure_backup()?;

    let mut report = replacer.apply(&mapping)?;
    report.metadata.total_mappings = raw.len();
    report.metadata.invalid_mappings = invalid;

    report.write(
        &settings.artifact(REPLACEMENT_REPORT_FILE),
        &settings.artifact(REPLACEMENT_SUMMARY_FILE),
    )?;
    Ok(report)
}
