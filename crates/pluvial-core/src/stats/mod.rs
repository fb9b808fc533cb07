pub mod ensemble;
pub mod normal;

pub use ensemble::{summarize, summarize_row, EnsembleStats, RowOutcome, Summary};
pub use normal::normal_cdf;

use serde::Serialize;

use crate::config::MissingMemberPolicy;
use crate::error::{Result, RowShapeError};
use crate::table::{CellRow, CellTable};

/// Counts gathered while computing a table's statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnsembleSummary {
    /// Rows that received stats.
    pub rows: usize,
    pub ratio_overrides: usize,
    pub prob_overrides: usize,
    /// Missing member samples left out of their row's ensemble.
    pub excluded_members: usize,
    /// Rows removed under [`MissingMemberPolicy::DropRow`].
    pub dropped_rows: usize,
    /// Rows with no usable member.
    pub empty_rows: usize,
}

/// Fill in `stats` for every row of `table`.
///
/// Rows are independent. With the `threading` feature they are evaluated on
/// the rayon pool; either way results are applied in row order, and the
/// first malformed row (in row order) aborts the whole computation before
/// any row is modified.
pub fn compute(table: &mut CellTable, policy: MissingMemberPolicy) -> Result<EnsembleSummary> {
    let n_members = table.n_members();
    let outcomes = evaluate(&table.rows, n_members, policy)
        .into_iter()
        .collect::<Result<Vec<_>, RowShapeError>>()?;

    let mut summary = EnsembleSummary::default();
    let mut keep = Vec::with_capacity(outcomes.len());
    for (row, outcome) in table.rows.iter_mut().zip(outcomes) {
        match outcome {
            RowOutcome::Summarized { summary: s, excluded } => {
                row.stats = Some(s.stats);
                summary.rows += 1;
                summary.ratio_overrides += s.ratio_override as usize;
                summary.prob_overrides += s.prob_override as usize;
                summary.excluded_members += excluded;
                keep.push(true);
            }
            RowOutcome::Empty { excluded } => {
                row.stats = None;
                summary.empty_rows += 1;
                summary.excluded_members += excluded;
                keep.push(true);
            }
            RowOutcome::Dropped => {
                summary.dropped_rows += 1;
                keep.push(false);
            }
        }
    }
    if summary.dropped_rows > 0 {
        let mut flags = keep.into_iter();
        table.rows.retain(|_| flags.next().unwrap_or(true));
    }

    tracing::info!(
        rows = summary.rows,
        members = n_members,
        ratio_overrides = summary.ratio_overrides,
        prob_overrides = summary.prob_overrides,
        excluded_members = summary.excluded_members,
        dropped_rows = summary.dropped_rows,
        empty_rows = summary.empty_rows,
        "computed ensemble statistics"
    );
    Ok(summary)
}

#[cfg(feature = "threading")]
fn evaluate(
    rows: &[CellRow],
    n_members: usize,
    policy: MissingMemberPolicy,
) -> Vec<Result<RowOutcome, RowShapeError>> {
    use rayon::prelude::*;
    rows.par_iter().map(|r| summarize_row(r, n_members, policy)).collect()
}

#[cfg(not(feature = "threading"))]
fn evaluate(
    rows: &[CellRow],
    n_members: usize,
    policy: MissingMemberPolicy,
) -> Vec<Result<RowOutcome, RowShapeError>> {
    rows.iter().map(|r| summarize_row(r, n_members, policy)).collect()
}
