//! Scene construction errors.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to read body catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse body catalog: {0}")]
    CatalogParse(#[from] ron::error::SpannedError),

    /// The requested root body is not in the catalog.
    #[error("root body '{0}' not found in catalog")]
    UnknownRoot(String),

    /// More bodies than a 24-bit picking color can address.
    #[error("body id space exhausted (max {max})")]
    IdSpaceExhausted { max: u32 },
}
