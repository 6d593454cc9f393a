use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Annotation file for batch {batch} not found: {}", path.display())]
    MissingAnnotationFile { batch: u8, path: PathBuf },

    #[error("Failed to parse {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid annotation in {} at line {line}: {reason}", path.display())]
    InvalidAnnotation {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Failed to load image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Record serialization error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("Truncated record: expected {expected} bytes, found {found}")]
    TruncatedRecord { expected: u64, found: u64 },

    #[error(
        "Could not place negative crops outside the face after {attempts} attempts ({width}x{height} image)"
    )]
    NegativeSamplingExhausted {
        attempts: usize,
        width: u32,
        height: u32,
    },

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown batch: {0} (expected 1, 2 or 3)")]
    UnknownBatch(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

pub type Result<T> = std::result::Result<T, Error>;
