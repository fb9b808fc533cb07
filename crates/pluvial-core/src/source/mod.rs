//! Grid sources: resolve a (model, scenario, resolution) key to a grid.
//!
//! Acquisition (download, cache, unzip) happens elsewhere. These readers only
//! open what it left on disk: GeoTIFF via the `tiff` crate and ESRI ASCII grids.
pub mod ascii;
pub mod geotiff;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::grid::Grid;

pub use ascii::{read_ascii_grid, write_ascii_grid};
pub use geotiff::read_geotiff;

/// Address of one grid in the acquisition collaborator's archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridKey {
    pub model: String,
    pub scenario: String,
    pub resolution: String,
}

impl GridKey {
    pub fn new(model: impl Into<String>, scenario: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            scenario: scenario.into(),
            resolution: resolution.into(),
        }
    }

    /// Fill `{model}`, `{scenario}` and `{resolution}` in `template`.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{model}", &self.model)
            .replace("{scenario}", &self.scenario)
            .replace("{resolution}", &self.resolution)
    }
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.model, self.scenario, self.resolution)
    }
}

/// Anything that can hand out a grid for a key.
pub trait GridSource {
    fn load(&self, key: &GridKey) -> Result<Grid, SourceError>;
}

/// Grids stored as files under one directory, named by a template.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    pub root: PathBuf,
    pub template: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, template: impl Into<String>) -> Self {
        Self { root: root.into(), template: template.into() }
    }

    pub fn path_for(&self, key: &GridKey) -> PathBuf {
        self.root.join(key.render(&self.template))
    }
}

impl GridSource for DirectorySource {
    fn load(&self, key: &GridKey) -> Result<Grid, SourceError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Err(SourceError::NotFound(format!("{key} (expected {})", path.display())));
        }
        read_grid(&path)
    }
}

/// In-memory grids, keyed directly.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    grids: HashMap<GridKey, Grid>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: GridKey, grid: Grid) -> &mut Self {
        self.grids.insert(key, grid);
        self
    }
}

impl GridSource for MemorySource {
    fn load(&self, key: &GridKey) -> Result<Grid, SourceError> {
        self.grids
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }
}

/// Read a single-band grid, choosing the decoder from the file extension.
pub fn read_grid(path: &Path) -> Result<Grid, SourceError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let grid = match ext.as_deref() {
        Some("tif") | Some("tiff") => read_geotiff(path)?,
        Some("asc") => read_ascii_grid(path)?,
        _ => return Err(SourceError::UnsupportedFormat(path.to_path_buf())),
    };
    tracing::debug!(
        path = %path.display(),
        geometry = %grid.geometry,
        valid = grid.valid_count(),
        "read grid"
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Extent;

    #[test]
    fn template_fills_every_placeholder() {
        let key = GridKey::new("MG", "rcp85", "10m");
        assert_eq!(key.render("{model}_{scenario}_{resolution}.tif"), "MG_rcp85_10m.tif");
        let src = DirectorySource::new("/data", "{resolution}/{model}.asc");
        assert_eq!(src.path_for(&key), PathBuf::from("/data/10m/MG.asc"));
    }

    #[test]
    fn memory_source_round_trips_and_reports_missing() {
        let mut src = MemorySource::new();
        let key = GridKey::new("AC", "rcp85", "10m");
        src.insert(key.clone(), Grid::from_rows(&[vec![1.0]], Extent::global()));
        assert_eq!(src.load(&key).unwrap().data, vec![1.0]);
        let err = src.load(&GridKey::new("BC", "rcp85", "10m")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(k) if k == "BC/rcp85/10m"));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = read_grid(Path::new("grid.nc")).unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let src = DirectorySource::new("/nonexistent-pluvial-dir", "{model}.tif");
        let err = src.load(&GridKey::new("AC", "rcp85", "10m")).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}
