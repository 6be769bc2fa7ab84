// THEORY:
// Every failure the engine can report lives in one taxonomy. The variants fall
// into two tiers:
// 1.  **Run-level** failures (`DatasetNotFound`, `ManifestUnreadable`,
//     `EmptyLabelSet`, `MissingPaletteEntry`, `InvalidParallelism`, `Cancelled`,
//     `WorkerPool`) abort the run and bubble up to the caller.
// 2.  **Entry-level** failures (`ManifestMalformed`, `UnreadableImage`) are
//     recovered where they happen: the offending row or image is skipped, a
//     warning is logged, and the error value is kept in the run report.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AspectError {
    /// The configured dataset root does not exist or is not a directory.
    #[error("dataset not found at {}", .root.display())]
    DatasetNotFound { root: PathBuf },

    /// The manifest file could not be opened or read.
    #[error("cannot read manifest {}: {source}", .path.display())]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest row was skipped. `line` is 1-based and counts the header.
    #[error("manifest line {line}: {reason}")]
    ManifestMalformed { line: usize, reason: String },

    /// The image header could not be read or parsed.
    #[error("unreadable image {}: {reason}", .path.display())]
    UnreadableImage { path: PathBuf, reason: String },

    /// A label reached the ratio workers without a palette entry.
    #[error("class label `{label}` has no palette entry")]
    MissingPaletteEntry { label: String },

    #[error("no class labels found; nothing to visualize")]
    EmptyLabelSet,

    #[error("worker pool needs at least one worker")]
    InvalidParallelism,

    #[error("run cancelled")]
    Cancelled,

    #[error("worker pool failure: {0}")]
    WorkerPool(String),
}

impl AspectError {
    /// Entry-level errors are skipped and reported; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AspectError::ManifestMalformed { .. } | AspectError::UnreadableImage { .. }
        )
    }
}

pub type AspectResult<T> = Result<T, AspectError>;
