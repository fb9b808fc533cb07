//! Raster ensemble alignment and exceedance statistics.
//!
//! A present-day precipitation grid and N projection grids are aligned into a
//! [`Stack`](align::Stack), flattened into a [`CellTable`](table::CellTable)
//! and summarised per cell by [`stats::compute`].

pub mod align;
pub mod config;
pub mod coords;
pub mod error;
pub mod grid;
pub mod pipeline;
pub mod source;
pub mod stats;
pub mod table;

pub use align::{align, Band, Stack};
pub use config::{MissingMemberPolicy, RunConfig};
pub use coords::Extent;
pub use error::{Error, GeometryError, RowShapeError, SourceError};
pub use grid::{Geometry, Grid};
pub use pipeline::{EnsemblePipeline, PipelineOutput};
pub use source::{DirectorySource, GridKey, GridSource, MemorySource};
pub use stats::{EnsembleStats, EnsembleSummary};
pub use table::{CellRow, CellTable};
