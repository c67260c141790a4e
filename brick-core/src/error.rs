//! Error types for brick operations.

use thiserror::Error;

/// Result type alias using the brick Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, solving or exporting a problem.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed geometric input (partitions, connectivity, inverted cells).
    #[error("mesh error: {0}")]
    Mesh(String),

    /// Element or basis construction errors.
    #[error("element error: {0}")]
    Element(String),

    /// Assembly errors.
    #[error("assembly error: {0}")]
    Assembly(String),

    /// Solver errors (bad dimensions, no convergence).
    #[error("solver error: {0}")]
    Solver(String),

    /// Matrix singularity or conditioning issues.
    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    /// Invalid material properties.
    #[error("invalid material: {0}")]
    InvalidMaterial(String),

    /// A geometric selection matched no facets or degrees of freedom.
    #[error("empty selection: {0}")]
    EmptySelection(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Visualization export failures.
    #[error("export error: {0}")]
    Export(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
