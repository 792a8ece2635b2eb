use std::path::PathBuf;
use thiserror::Error;

/// Preconditions that abort a pipeline stage.
///
/// Everything else (a bad file, a failed request, an invalid mapping entry) is
/// logged and degraded in place rather than surfaced here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source tree to extract from or replace in does not exist
    #[error("Source directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Extraction artifact missing when the translate stage starts
    #[error("Extraction output not found: {}\n\nTip: Run the extract stage first", .0.display())]
    ExtractionNotFound(PathBuf),

    /// Mapping artifact missing when the replace stage starts
    #[error("Translation mapping not found: {}\n\nTip: Run the translate stage first", .0.display())]
    MappingNotFound(PathBuf),

    /// Required credential not configured
    #[error("{0} not set")]
    MissingCredential(&'static str),

    /// Restore requested but no backup exists
    #[error("Backup directory not found: {}", .0.display())]
    BackupNotFound(PathBuf),
}
