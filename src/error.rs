use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by hashing, indexing, and hash-list parsing.
#[derive(Debug, Error)]
pub enum Error {
    /// A hash string is not 64 hexadecimal digits.
    #[error("malformed hash \"{input}\": expected 64 hex digits")]
    Format { input: String },

    /// An image could not be read or decoded.
    #[error("could not decode image {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The distance threshold is beyond what the multi-index query can enumerate.
    /// Use a brute-force query instead.
    #[error("distance threshold {d} out of bounds 0..={max}; use brute-force search")]
    DimensionExceeded { d: usize, max: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Wraps an error with the 1-based line number it was found at.
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
