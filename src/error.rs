use std::path::PathBuf;

use thiserror::Error;

/// Failures with a meaning of their own. Plain I/O, SQLite and HTTP errors
/// travel through `anyhow` with context instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no stable release found at {url}")]
    NoRelease { url: String },

    #[error("release {version} has no downloadable assets")]
    NoAssets { version: String },

    #[error("documentation directory not found: {0:?}")]
    MissingDocs(PathBuf),

    #[error("unknown placeholder `${placeholder}` in template")]
    Template { placeholder: String },
}
