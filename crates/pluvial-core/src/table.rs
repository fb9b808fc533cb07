//! Per-cell table: one row per cell with a baseline sample, one column per band.
//!
//! Row order is raster scan order (north to south, west to east) of the
//! cropped region, so two runs on the same inputs serialise identically.
use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::align::Stack;
use crate::coords::Extent;
use crate::error::Result;
use crate::grid::{Geometry, Grid};
use crate::stats::EnsembleStats;

/// Derived column names, in output order.
pub const MEAN_COLUMN: &str = "pr_fut";
pub const SD_COLUMN: &str = "pr_fut_sd";
pub const RATIO_COLUMN: &str = "r_pr_fut";
pub const PROB_COLUMN: &str = "t_pr_fut";
pub const RANK_COLUMN: &str = "rank_pr_fut";

pub const DERIVED_COLUMNS: [&str; 5] = [MEAN_COLUMN, SD_COLUMN, RATIO_COLUMN, PROB_COLUMN, RANK_COLUMN];

/// One retained cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRow {
    pub row: usize,
    pub col: usize,
    /// Cell centre longitude.
    pub x: f64,
    /// Cell centre latitude.
    pub y: f64,
    /// One sample per band; index 0 is the baseline. NaN = missing.
    pub samples: Vec<f32>,
    /// Filled by [`crate::stats::compute`].
    pub stats: Option<EnsembleStats>,
}

impl CellRow {
    pub fn baseline(&self) -> f32 {
        self.samples[0]
    }

    pub fn members(&self) -> &[f32] {
        &self.samples[1..]
    }

    fn derived(&self, name: &str) -> Option<f64> {
        let s = self.stats.as_ref()?;
        match name {
            MEAN_COLUMN => Some(s.fut_mean),
            SD_COLUMN => Some(s.fut_sd),
            RATIO_COLUMN => Some(s.ratio),
            PROB_COLUMN => Some(s.prob_score),
            RANK_COLUMN => Some(s.rank_score),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellTable {
    /// Geometry of the cropped region the rows were taken from.
    pub geometry: Geometry,
    /// Input column labels, in stack band order.
    pub labels: Vec<String>,
    pub rows: Vec<CellRow>,
}

impl CellTable {
    /// Crop `stack` to `region` and keep every cell whose baseline is present.
    pub fn from_stack(stack: &Stack, region: &Extent) -> Result<CellTable> {
        let cropped = stack.crop(region)?;
        let geometry = cropped.geometry;
        let labels: Vec<String> = cropped.bands.iter().map(|b| b.label.clone()).collect();

        let mut rows = Vec::new();
        let mut missing_baseline = 0usize;
        for r in 0..geometry.height {
            for c in 0..geometry.width {
                let idx = r * geometry.width + c;
                if cropped.bands[0].data[idx].is_nan() {
                    missing_baseline += 1;
                    continue;
                }
                let (x, y) = geometry.cell_center(r, c);
                rows.push(CellRow {
                    row: r,
                    col: c,
                    x,
                    y,
                    samples: cropped.bands.iter().map(|b| b.data[idx]).collect(),
                    stats: None,
                });
            }
        }

        tracing::info!(
            region = %region,
            geometry = %geometry,
            rows = rows.len(),
            missing_baseline,
            "built cell table"
        );
        Ok(CellTable { geometry, labels, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of projection members per row.
    pub fn n_members(&self) -> usize {
        self.labels.len().saturating_sub(1)
    }

    /// Every column name in output order, starting with `x` and `y`.
    pub fn columns(&self) -> Vec<String> {
        ["x", "y"]
            .iter()
            .map(|s| s.to_string())
            .chain(self.labels.iter().cloned())
            .chain(DERIVED_COLUMNS.iter().map(|s| s.to_string()))
            .collect()
    }

    /// Values of one column in row order. Missing values are NaN.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        match name {
            "x" => return Some(self.rows.iter().map(|r| r.x).collect()),
            "y" => return Some(self.rows.iter().map(|r| r.y).collect()),
            _ => {}
        }
        if let Some(i) = self.labels.iter().position(|l| l == name) {
            return Some(self.rows.iter().map(|r| r.samples[i] as f64).collect());
        }
        if DERIVED_COLUMNS.contains(&name) {
            return Some(
                self.rows
                    .iter()
                    .map(|r| r.derived(name).unwrap_or(f64::NAN))
                    .collect(),
            );
        }
        None
    }

    /// Re-rasterise a column onto the table geometry; cells without a row are NaN.
    pub fn rasterize(&self, name: &str) -> Option<Grid> {
        let values = self.column(name)?;
        let mut grid = Grid::new(self.geometry, f32::NAN);
        for (row, v) in self.rows.iter().zip(values) {
            grid.set(row.row, row.col, v as f32);
        }
        Some(grid)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// `{ "geometry", "columns", "rows": [ { column: value, ... } ] }`.
/// Missing (NaN) values serialise as JSON `null`; infinities as the strings
/// `"inf"` and `"-inf"`.
impl Serialize for CellTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_struct("CellTable", 3)?;
        doc.serialize_field("geometry", &self.geometry)?;
        doc.serialize_field("columns", &self.columns())?;
        doc.serialize_field("rows", &Records(self))?;
        doc.end()
    }
}

struct Records<'a>(&'a CellTable);
struct Record<'a>(&'a [String], &'a CellRow);

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.rows.len()))?;
        for row in &self.0.rows {
            seq.serialize_element(&Record(&self.0.labels, row))?;
        }
        seq.end()
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Record(labels, row) = self;
        let mut map = serializer.serialize_map(Some(2 + labels.len() + DERIVED_COLUMNS.len()))?;
        map.serialize_entry("x", &row.x)?;
        map.serialize_entry("y", &row.y)?;
        for (label, v) in labels.iter().zip(&row.samples) {
            map.serialize_entry(label, &CellValue(*v as f64))?;
        }
        for name in DERIVED_COLUMNS {
            map.serialize_entry(name, &row.derived(name).map(CellValue))?;
        }
        map.end()
    }
}

/// Marker strings for infinite cell values.
pub const POS_INF: &str = "inf";
pub const NEG_INF: &str = "-inf";

struct CellValue(f64);

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_nan() {
            serializer.serialize_none()
        } else if v.is_infinite() {
            serializer.serialize_str(if v > 0.0 { POS_INF } else { NEG_INF })
        } else {
            serializer.serialize_f64(v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align;
    use crate::config::MissingMemberPolicy;
    use crate::stats::compute;

    fn stack_3x2() -> Stack {
        let extent = Extent::new(0.0, 3.0, 0.0, 2.0);
        let pres = Grid::from_rows(&[vec![1.0, f32::NAN, 3.0], vec![4.0, 5.0, 6.0]], extent);
        let fut = Grid::from_rows(&[vec![1.5, 2.5, f32::NAN], vec![4.5, 5.5, 6.5]], extent);
        align(pres, vec![("AC".into(), fut)]).unwrap()
    }

    #[test]
    fn missing_baseline_cells_are_dropped_in_scan_order() {
        let table = CellTable::from_stack(&stack_3x2(), &Extent::global()).unwrap();
        let cells: Vec<(usize, usize)> = table.rows.iter().map(|r| (r.row, r.col)).collect();
        assert_eq!(cells, vec![(0, 0), (0, 2), (1, 0), (1, 1), (1, 2)]);
        assert_eq!(table.rows[0].x, 0.5);
        assert_eq!(table.rows[0].y, 1.5);
    }

    #[test]
    fn missing_projection_sample_is_kept_as_nan() {
        let table = CellTable::from_stack(&stack_3x2(), &Extent::global()).unwrap();
        assert_eq!(table.rows[1].baseline(), 3.0);
        assert!(table.rows[1].members()[0].is_nan());
    }

    #[test]
    fn region_crop_limits_rows() {
        let table = CellTable::from_stack(&stack_3x2(), &Extent::new(0.0, 3.0, 0.0, 1.0)).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.geometry.height, 1);
        assert!(table.rows.iter().all(|r| r.row == 0 && r.y == 0.5));
    }

    #[test]
    fn columns_mirror_band_order() {
        let table = CellTable::from_stack(&stack_3x2(), &Extent::global()).unwrap();
        assert_eq!(
            table.columns(),
            vec!["x", "y", "pr_pres", "pr_fut_AC", "pr_fut", "pr_fut_sd", "r_pr_fut", "t_pr_fut", "rank_pr_fut"]
        );
        assert_eq!(table.column("pr_pres").unwrap(), vec![1.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(table.column("rank_pr_fut").unwrap().iter().all(|v| v.is_nan()));
        assert!(table.column("nope").is_none());
    }

    #[test]
    fn rasterize_restores_holes() {
        let table = CellTable::from_stack(&stack_3x2(), &Extent::global()).unwrap();
        let grid = table.rasterize("pr_pres").unwrap();
        assert_eq!(grid.get(1, 2), 6.0);
        assert!(grid.get(0, 1).is_nan());
    }

    #[test]
    fn serialisation_is_deterministic_and_nulls_missing() {
        let table = CellTable::from_stack(&stack_3x2(), &Extent::global()).unwrap();
        let a = table.to_json_string().unwrap();
        let b = CellTable::from_stack(&stack_3x2(), &Extent::global()).unwrap().to_json_string().unwrap();
        assert_eq!(a, b);

        let doc: serde_json::Value = serde_json::from_str(&a).unwrap();
        let second = &doc["rows"][1];
        assert_eq!(second["pr_pres"], 3.0);
        assert!(second["pr_fut_AC"].is_null());
        assert!(second["rank_pr_fut"].is_null());
        assert_eq!(doc["geometry"]["width"], 3);
    }

    #[test]
    fn zero_baseline_wet_cell_keeps_infinite_ratio_apart_from_missing() {
        let extent = Extent::new(0.0, 2.0, 0.0, 1.0);
        let stack = align(
            Grid::from_rows(&[vec![0.0, 5.0]], extent),
            vec![
                ("AC".into(), Grid::from_rows(&[vec![3.0, f32::NAN]], extent)),
                ("BC".into(), Grid::from_rows(&[vec![5.0, f32::NAN]], extent)),
            ],
        )
        .unwrap();
        let mut table = CellTable::from_stack(&stack, &extent).unwrap();
        compute(&mut table, MissingMemberPolicy::Exclude).unwrap();
        assert_eq!(table.rows[0].stats.unwrap().ratio, f64::INFINITY);
        assert!(table.rows[1].stats.is_none());

        let doc: serde_json::Value = serde_json::from_str(&table.to_json_string().unwrap()).unwrap();
        assert_eq!(doc["rows"][0]["r_pr_fut"], POS_INF);
        assert_eq!(doc["rows"][0]["pr_fut"], 4.0);
        assert!(doc["rows"][1]["r_pr_fut"].is_null());
        assert!(doc["rows"][1]["pr_fut_AC"].is_null());
    }

    #[test]
    fn infinite_samples_serialise_as_signed_markers() {
        let json = |v: f64| serde_json::to_string(&CellValue(v)).unwrap();
        assert_eq!(json(f64::NEG_INFINITY), "\"-inf\"");
        assert_eq!(json(f64::NAN), "null");
        assert_eq!(json(2.5), "2.5");
    }
}
