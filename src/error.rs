//! Error taxonomy for the clustering report pipeline

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    /// A source file (or one of its sidecars) is absent. Terminal for the render.
    #[error("source file not found: {}", path.display())]
    MissingSource { path: PathBuf },

    /// The geo-filter left nothing to cluster.
    #[error("no valid business records for {municipality} after cleaning")]
    NoData { municipality: String },

    #[error("clustering is undefined for this input: {reason}")]
    DegenerateClustering { reason: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("rendering failed: {message}")]
    Render { message: String },

    #[error("table processing error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("feature matrix error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ReportError {
    pub fn degenerate(reason: impl Into<String>) -> Self {
        ReportError::DegenerateClustering {
            reason: reason.into(),
        }
    }

    /// Process exit code used by the CLI for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReportError::NoData { .. } => 2,
            ReportError::DegenerateClustering { .. } => 3,
            ReportError::Config { .. } | ReportError::Toml(_) => 4,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
