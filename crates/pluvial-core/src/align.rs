//! Grid alignment: crop the baseline onto the projections' grid and stack
//! every grid into one multi-band structure with shared geometry.
//!
//! Projections are expected to share one global grid already. Only the
//! baseline is cropped. Nothing is resampled: a geometry mismatch after
//! cropping is a [`GeometryError`].
use std::collections::HashSet;

use crate::coords::Extent;
use crate::error::{Error, GeometryError, Result};
use crate::grid::{Geometry, Grid};

/// Label of the present-day baseline band.
pub const BASELINE_LABEL: &str = "pr_pres";
/// Prefix of every projection band label.
pub const PROJECTION_PREFIX: &str = "pr_fut_";

/// Label for the projection of `model_id`.
pub fn projection_label(model_id: &str) -> String {
    format!("{PROJECTION_PREFIX}{model_id}")
}

/// One labelled layer of a [`Stack`].
#[derive(Debug, Clone)]
pub struct Band {
    pub label: String,
    pub data: Vec<f32>,
}

/// Ordered bands sharing one geometry. Band 0 is the baseline.
#[derive(Debug, Clone)]
pub struct Stack {
    pub geometry: Geometry,
    pub bands: Vec<Band>,
}

impl Stack {
    pub fn labels(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.label.as_str()).collect()
    }

    pub fn band(&self, label: &str) -> Option<&Band> {
        self.bands.iter().find(|b| b.label == label)
    }

    /// Number of projection members (every band after the baseline).
    pub fn n_members(&self) -> usize {
        self.bands.len().saturating_sub(1)
    }

    /// Crop every band to the cells covering `region`.
    pub fn crop(&self, region: &Extent) -> Result<Stack, GeometryError> {
        let w = self.geometry.window(region).ok_or(GeometryError::NoOverlap {
            region: *region,
            extent: self.geometry.extent,
        })?;
        let width = self.geometry.width;
        let bands = self
            .bands
            .iter()
            .map(|b| {
                let mut data = Vec::with_capacity(w.rows * w.cols);
                for r in w.row0..w.row0 + w.rows {
                    let start = r * width + w.col0;
                    data.extend_from_slice(&b.data[start..start + w.cols]);
                }
                Band { label: b.label.clone(), data }
            })
            .collect();
        Ok(Stack { geometry: self.geometry.subset(w), bands })
    }
}

/// Align `baseline` with `projections` (model id, grid) into a [`Stack`].
///
/// The first projection's extent is the reference. The baseline is cropped to
/// it, then every grid must match the reference geometry exactly.
pub fn align(baseline: Grid, projections: Vec<(String, Grid)>) -> Result<Stack> {
    let reference = match projections.first() {
        Some((_, grid)) => grid.geometry,
        None => return Err(Error::EmptyEnsemble),
    };

    let baseline = baseline.crop(&reference.extent)?;
    tracing::debug!(
        reference = %reference,
        baseline = %baseline.geometry,
        "cropped baseline to projection extent"
    );

    let mut seen = HashSet::new();
    let mut bands = Vec::with_capacity(projections.len() + 1);

    for (label, grid) in std::iter::once((BASELINE_LABEL.to_string(), baseline))
        .chain(projections.into_iter().map(|(id, g)| (projection_label(&id), g)))
    {
        if !seen.insert(label.clone()) {
            return Err(Error::DuplicateLabel(label));
        }
        if !reference.same_grid(&grid.geometry) {
            return Err(GeometryError::Mismatch {
                label,
                expected: reference,
                found: grid.geometry,
            }
            .into());
        }
        tracing::debug!(band = %label, valid = grid.valid_count(), "stacked band");
        bands.push(Band { label, data: grid.data });
    }

    tracing::info!(
        bands = bands.len(),
        width = reference.width,
        height = reference.height,
        "aligned ensemble stack"
    );
    Ok(Stack { geometry: reference, bands })
}
