use std::path::PathBuf;

use thiserror::Error;

use crate::coords::Extent;
use crate::grid::Geometry;

/// Grids that cannot share one raster geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("band `{label}` does not match the reference grid: expected {expected}, found {found}")]
    Mismatch {
        label: String,
        expected: Geometry,
        found: Geometry,
    },
    #[error("region {region} does not overlap grid extent {extent}")]
    NoOverlap { region: Extent, extent: Extent },
}

/// A cell row with the wrong number of samples for the ensemble.
#[derive(Debug, Error, PartialEq)]
#[error("row at ({x}, {y}) has {found} samples, expected {expected}")]
pub struct RowShapeError {
    pub x: f64,
    pub y: f64,
    pub expected: usize,
    pub found: usize,
}

/// Failures reading a grid from disk or resolving a grid key.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TIFF decode error in {path}: {source}")]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },
    #[error("malformed grid {path}: {detail}")]
    Format { path: PathBuf, detail: String },
    #[error("unsupported grid format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("no grid registered for {0}")]
    NotFound(String),
}

impl SourceError {
    pub(crate) fn format(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        SourceError::Format { path: path.into(), detail: detail.into() }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    RowShape(#[from] RowShapeError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("ensemble has no projection members")]
    EmptyEnsemble,
    #[error("duplicate band label `{0}`")]
    DuplicateLabel(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
