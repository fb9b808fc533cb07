//! Pipeline orchestrator: runs every stage in order.

use crate::align::align;
use crate::config::RunConfig;
use crate::error::Result;
use crate::grid::Grid;
use crate::source::GridSource;
use crate::stats::{compute, EnsembleSummary};
use crate::table::CellTable;

/// Output of one run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: CellTable,
    pub summary: EnsembleSummary,
}

/// The main pipeline orchestrator.
pub struct EnsemblePipeline {
    config: RunConfig,
}

impl EnsemblePipeline {
    /// Fails if the configuration is unusable.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Load every grid from `source` and run the pipeline on them.
    pub fn run(&self, source: &dyn GridSource) -> Result<PipelineOutput> {
        let baseline = source.load(&self.config.baseline)?;
        tracing::info!(key = %self.config.baseline, geometry = %baseline.geometry, "loaded baseline");

        let mut projections = Vec::with_capacity(self.config.models.len());
        for key in self.config.projection_keys() {
            let grid = source.load(&key)?;
            tracing::debug!(key = %key, geometry = %grid.geometry, "loaded projection");
            projections.push((key.model, grid));
        }
        tracing::info!(members = projections.len(), "loaded projections");

        self.run_grids(baseline, projections)
    }

    /// Run the pipeline on grids already in memory.
    ///
    /// Stages (each finishes before the next starts):
    ///   1. Alignment
    ///   2. Region crop + cell table
    ///   3. Ensemble statistics
    pub fn run_grids(&self, baseline: Grid, projections: Vec<(String, Grid)>) -> Result<PipelineOutput> {
        // ── 1. Alignment ────────────────────────────────────────────────────
        let stack = align(baseline, projections)?;

        // ── 2. Cell table ───────────────────────────────────────────────────
        let mut table = CellTable::from_stack(&stack, &self.config.region)?;
        drop(stack);

        // ── 3. Statistics ───────────────────────────────────────────────────
        let summary = compute(&mut table, self.config.missing_members)?;

        Ok(PipelineOutput { table, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Extent;
    use crate::error::{Error, SourceError};
    use crate::source::{GridKey, MemorySource};

    fn config(models: &[&str]) -> RunConfig {
        RunConfig {
            models: models.iter().map(|m| m.to_string()).collect(),
            region: Extent::global(),
            ..RunConfig::default()
        }
    }

    #[test]
    fn run_loads_every_member_from_the_source() {
        let extent = Extent::new(0.0, 2.0, 0.0, 1.0);
        let cfg = config(&["AC", "BC"]);
        let mut src = MemorySource::new();
        src.insert(cfg.baseline.clone(), Grid::from_rows(&[vec![50.0, 100.0]], extent))
            .insert(GridKey::new("AC", "rcp85", "10m"), Grid::from_rows(&[vec![60.0, 90.0]], extent))
            .insert(GridKey::new("BC", "rcp85", "10m"), Grid::from_rows(&[vec![40.0, 110.0]], extent));

        let out = EnsemblePipeline::new(cfg).unwrap().run(&src).unwrap();
        assert_eq!(out.summary.rows, 2);
        assert_eq!(out.table.labels, vec!["pr_pres", "pr_fut_AC", "pr_fut_BC"]);
    }

    #[test]
    fn missing_member_grid_is_a_source_error() {
        let extent = Extent::new(0.0, 1.0, 0.0, 1.0);
        let cfg = config(&["AC"]);
        let mut src = MemorySource::new();
        src.insert(cfg.baseline.clone(), Grid::from_rows(&[vec![1.0]], extent));
        let err = EnsemblePipeline::new(cfg).unwrap().run(&src).unwrap_err();
        assert!(matches!(err, Error::Source(SourceError::NotFound(_))));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        assert!(EnsemblePipeline::new(config(&[])).is_err());
    }
}
