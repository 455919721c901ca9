use std::path::PathBuf;
use thiserror::Error;

use crate::trail::Trail;

/// Core error type for pkgwalk operations.
///
/// A walk never retries: the first error produced by any task becomes
/// the run's terminal failure.
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No package descriptor found at {}", .path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("Failed to parse package descriptor at {}: {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dependency not found in node_modules: {name} (searched from {trail})")]
    DependencyNotFound { name: String, trail: Trail },
}
