//! Traversal rules shared by extraction, replacement and backup.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Dependency, version-control and build-output directories never visited
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".vscode",
    "dist",
    "build",
    "out",
    "coverage",
    ".nuxt",
    ".next",
    ".output",
    ".vite",
    ".cache",
    "release",
    "target",
];

/// Bundler, linter and type-checker configs plus package manifests
pub const EXCLUDED_FILES: &[&str] = &[
    "vite.config.js",
    "vite.config.ts",
    "vite.config.mjs",
    "vitest.config.ts",
    "vitest.config.js",
    "webpack.config.js",
    "vue.config.js",
    "babel.config.js",
    "postcss.config.js",
    "tailwind.config.js",
    "tailwind.config.ts",
    "jest.config.js",
    "jest.config.ts",
    "rollup.config.js",
    "electron.vite.config.ts",
    "electron-builder.config.js",
    ".eslintrc.js",
    ".eslintrc.cjs",
    "eslint.config.js",
    "eslint.config.mjs",
    ".prettierrc.js",
    "prettier.config.js",
    "commitlint.config.js",
    "tsconfig.json",
    "jsconfig.json",
    "package.json",
    "package-lock.json",
];

/// File kinds the pipeline reads and rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Single-file component with template and script zones
    Component,
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".d.ts") {
            return None;
        }
        match path.extension()?.to_str()? {
            "vue" => Some(Self::Component),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "jsx" => Some(Self::Jsx),
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            _ => None,
        }
    }
}

fn is_excluded_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_DIRS.contains(&name))
            .unwrap_or(false)
}

fn is_excluded_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| EXCLUDED_FILES.contains(&name))
        .unwrap_or(false)
}

/// Whether `entry` is the directory `skip` (already canonical)
fn is_skipped_dir(entry: &DirEntry, skip: Option<&Path>) -> bool {
    match skip {
        Some(skip) => {
            entry.file_type().is_dir()
                && entry
                    .path()
                    .canonicalize()
                    .map(|p| p == skip)
                    .unwrap_or(false)
        }
        None => false,
    }
}

/// All component and script files under `root`, in a stable order.
///
/// Unreadable directory entries are logged and skipped.
pub fn source_files(root: &Path) -> Vec<(PathBuf, SourceKind)> {
    walk_sources(root, None)
}

/// Like [`source_files`], but never descends into `skip`
pub fn source_files_except(root: &Path, skip: &Path) -> Vec<(PathBuf, SourceKind)> {
    let skip = skip.canonicalize().ok();
    walk_sources(root, skip.as_deref())
}

fn walk_sources(root: &Path, skip: Option<&Path>) -> Vec<(PathBuf, SourceKind)> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e) && !is_skipped_dir(e, skip));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || is_excluded_file(entry.path()) {
            continue;
        }
        if let Some(kind) = SourceKind::from_path(entry.path()) {
            files.push((entry.into_path(), kind));
        }
    }

    files
}

/// Path of `path` relative to `root`, always with forward slashes
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Recursively copy `from` into `to`, skipping excluded directories and
/// `to` itself when it lies inside `from`.
///
/// Returns the number of files copied.
pub fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;

    fs::create_dir_all(to).with_context(|| format!("Failed to create {}", to.display()))?;
    let target_root = to
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", to.display()))?;

    let walker = WalkDir::new(from)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e) && !is_skipped_dir(e, Some(&target_root)));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", from.display()))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
            copied += 1;
        }
    }

    debug!("Copied {} files from {} to {}", copied, from.display(), to.display());
    Ok(copied)
}
