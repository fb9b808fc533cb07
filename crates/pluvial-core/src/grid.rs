use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::Extent;
use crate::error::GeometryError;

/// Relative tolerance, in cells, when comparing two geometries.
const GRID_TOLERANCE: f64 = 1e-6;

/// Raster geometry: cell counts over a lon/lat extent.
/// Row 0 is the northern edge, column 0 the western edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
    pub extent: Extent,
}

/// A rectangular block of cells inside a [`Geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub row0: usize,
    pub col0: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Geometry {
    pub fn new(width: usize, height: usize, extent: Extent) -> Self {
        Self { width, height, extent }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell size `(dx, dy)` in degrees.
    pub fn cell_size(&self) -> (f64, f64) {
        (
            self.extent.width() / self.width as f64,
            self.extent.height() / self.height as f64,
        )
    }

    /// Centre `(x, y)` of the cell at `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let (dx, dy) = self.cell_size();
        (
            self.extent.min_lon + (col as f64 + 0.5) * dx,
            self.extent.max_lat - (row as f64 + 0.5) * dy,
        )
    }

    /// The `(row, col)` of the cell containing `(x, y)`, if any.
    pub fn cell_index(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !self.extent.contains(x, y) || self.is_empty() {
            return None;
        }
        let (dx, dy) = self.cell_size();
        let col = (((x - self.extent.min_lon) / dx).floor() as usize).min(self.width - 1);
        let row = (((self.extent.max_lat - y) / dy).floor() as usize).min(self.height - 1);
        Some((row, col))
    }

    /// Cells covering `region`, snapped outward to whole cells.
    /// Returns None if the region does not overlap this geometry.
    pub fn window(&self, region: &Extent) -> Option<Window> {
        if !self.extent.intersects(region) || self.is_empty() {
            return None;
        }
        let (dx, dy) = self.cell_size();
        let e = &self.extent;

        // The epsilon keeps a region edge that falls on a cell edge from
        // pulling in the neighbouring cell.
        let col_start = ((region.min_lon - e.min_lon) / dx + GRID_TOLERANCE).floor().max(0.0);
        let col_end = ((region.max_lon - e.min_lon) / dx - GRID_TOLERANCE).ceil().min(self.width as f64);
        let row_start = ((e.max_lat - region.max_lat) / dy + GRID_TOLERANCE).floor().max(0.0);
        let row_end = ((e.max_lat - region.min_lat) / dy - GRID_TOLERANCE).ceil().min(self.height as f64);

        if col_end <= col_start || row_end <= row_start {
            return None;
        }
        Some(Window {
            row0: row_start as usize,
            col0: col_start as usize,
            rows: (row_end - row_start) as usize,
            cols: (col_end - col_start) as usize,
        })
    }

    /// Geometry of a window of this grid.
    pub fn subset(&self, w: Window) -> Geometry {
        let (dx, dy) = self.cell_size();
        let e = &self.extent;
        let min_lon = e.min_lon + w.col0 as f64 * dx;
        let max_lat = e.max_lat - w.row0 as f64 * dy;
        Geometry::new(
            w.cols,
            w.rows,
            Extent::new(min_lon, min_lon + w.cols as f64 * dx, max_lat - w.rows as f64 * dy, max_lat),
        )
    }

    /// Same cell counts, cell size and extent, within a millionth of a cell.
    pub fn same_grid(&self, other: &Geometry) -> bool {
        if self.width != other.width || self.height != other.height {
            return false;
        }
        let (dx, dy) = self.cell_size();
        let (ox, oy) = other.cell_size();
        let tol_x = dx.abs() * GRID_TOLERANCE;
        let tol_y = dy.abs() * GRID_TOLERANCE;
        (dx - ox).abs() <= tol_x
            && (dy - oy).abs() <= tol_y
            && (self.extent.min_lon - other.extent.min_lon).abs() <= tol_x
            && (self.extent.max_lon - other.extent.max_lon).abs() <= tol_x
            && (self.extent.min_lat - other.extent.min_lat).abs() <= tol_y
            && (self.extent.max_lat - other.extent.max_lat).abs() <= tol_y
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (dx, dy) = self.cell_size();
        write!(f, "{}x{} cells of {dx}x{dy} over {}", self.width, self.height, self.extent)
    }
}

/// A single-band grid of f32 samples, row-major.
/// Missing samples are NaN; readers convert no-data sentinels on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub geometry: Geometry,
    pub data: Vec<f32>,
}

impl Grid {
    /// Create a new Grid filled with the given value.
    pub fn new(geometry: Geometry, fill: f32) -> Self {
        Self { data: vec![fill; geometry.len()], geometry }
    }

    /// Build a grid from north-to-south rows over `extent`.
    /// Panics if the rows are ragged.
    pub fn from_rows(rows: &[Vec<f32>], extent: Extent) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        assert!(rows.iter().all(|r| r.len() == width), "ragged grid rows");
        Self {
            geometry: Geometry::new(width, height, extent),
            data: rows.concat(),
        }
    }

    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.geometry.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.geometry.width + col] = val;
    }

    /// Copy out the cells of `w`.
    pub fn extract(&self, w: Window) -> Grid {
        let mut data = Vec::with_capacity(w.rows * w.cols);
        for r in w.row0..w.row0 + w.rows {
            let start = r * self.geometry.width + w.col0;
            data.extend_from_slice(&self.data[start..start + w.cols]);
        }
        Grid { geometry: self.geometry.subset(w), data }
    }

    /// Crop to the cells covering `region`, snapped outward to whole cells.
    pub fn crop(&self, region: &Extent) -> Result<Grid, GeometryError> {
        let w = self.geometry.window(region).ok_or(GeometryError::NoOverlap {
            region: *region,
            extent: self.geometry.extent,
        })?;
        Ok(self.extract(w))
    }

    /// Number of non-missing samples.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// (min, max) over non-missing samples, None if every sample is missing.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 36x18 global grid at 10 degrees, value = row * 100 + col.
    fn global_10deg() -> Grid {
        let mut g = Grid::new(Geometry::new(36, 18, Extent::global()), 0.0);
        for r in 0..18 {
            for c in 0..36 {
                g.set(r, c, (r * 100 + c) as f32);
            }
        }
        g
    }

    #[test]
    fn cell_center_is_north_up() {
        let g = global_10deg();
        assert_eq!(g.geometry.cell_center(0, 0), (-175.0, 85.0));
        assert_eq!(g.geometry.cell_center(17, 35), (175.0, -85.0));
        assert_eq!(g.geometry.cell_index(-175.0, 85.0), Some((0, 0)));
    }

    #[test]
    fn crop_on_cell_edges_is_exact() {
        let g = global_10deg();
        let c = g.crop(&Extent::new(0.0, 30.0, -20.0, 20.0)).unwrap();
        assert_eq!((c.width(), c.height()), (3, 4));
        assert_eq!(c.geometry.extent, Extent::new(0.0, 30.0, -20.0, 20.0));
        // row 7 is 20..10 N, col 18 is 0..10 E
        assert_eq!(c.get(0, 0), 718.0);
    }

    #[test]
    fn crop_snaps_outward() {
        let g = global_10deg();
        let c = g.crop(&Extent::tropics()).unwrap();
        // 23.44 rounds out to the 30 degree cell edges
        assert_eq!(c.height(), 6);
        assert_eq!(c.width(), 36);
        assert_eq!(c.geometry.extent.max_lat, 30.0);
        assert_eq!(c.geometry.extent.min_lat, -30.0);
    }

    #[test]
    fn crop_outside_fails() {
        let g = Grid::new(Geometry::new(2, 2, Extent::new(0.0, 2.0, 0.0, 2.0)), 1.0);
        let err = g.crop(&Extent::new(10.0, 20.0, 10.0, 20.0)).unwrap_err();
        assert!(matches!(err, GeometryError::NoOverlap { .. }));
    }

    #[test]
    fn same_grid_tolerates_rounding_only() {
        let a = Geometry::new(4, 2, Extent::new(0.0, 4.0, 0.0, 2.0));
        let b = Geometry::new(4, 2, Extent::new(1e-9, 4.0 + 1e-9, 0.0, 2.0));
        let c = Geometry::new(4, 2, Extent::new(0.5, 4.5, 0.0, 2.0));
        assert!(a.same_grid(&b));
        assert!(!a.same_grid(&c));
    }

    #[test]
    fn value_range_skips_missing() {
        let g = Grid::from_rows(&[vec![f32::NAN, 3.0], vec![-1.0, f32::NAN]], Extent::new(0.0, 2.0, 0.0, 2.0));
        assert_eq!(g.value_range(), Some((-1.0, 3.0)));
        assert_eq!(g.valid_count(), 2);
    }
}
