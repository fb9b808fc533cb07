//! Per-cell ensemble summary.
//!
//! Every function here is a pure function of one row's samples. Degenerate
//! inputs are handled by explicit overrides that are checked before the
//! generic formula:
//!   b == 0 and mean == 0        → ratio = 1
//!   b == f_i for every member  → prob  = 0.5
use serde::Serialize;

use super::normal::normal_cdf;
use crate::config::MissingMemberPolicy;
use crate::error::RowShapeError;
use crate::table::CellRow;

/// Derived values for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnsembleStats {
    /// Ensemble mean of the projections.
    pub fut_mean: f64,
    /// Unbiased sample standard deviation (n − 1). NaN with fewer than two members.
    pub fut_sd: f64,
    /// `fut_mean / baseline`.
    pub ratio: f64,
    /// Φ((fut_mean − baseline) / fut_sd).
    pub prob_score: f64,
    /// Fraction of members strictly above the baseline.
    pub rank_score: f64,
    /// Members that entered the computation.
    pub members_used: usize,
}

/// Stats plus which overrides fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub stats: EnsembleStats,
    pub ratio_override: bool,
    pub prob_override: bool,
}

/// Result of summarising one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowOutcome {
    Summarized { summary: Summary, excluded: usize },
    /// Every member was missing; the row keeps no stats.
    Empty { excluded: usize },
    /// A member was missing under [`MissingMemberPolicy::DropRow`].
    Dropped,
}

/// Summarise a baseline against members that are all present.
/// Returns None for an empty ensemble.
pub fn summarize(baseline: f64, members: &[f64]) -> Option<Summary> {
    if members.is_empty() {
        return None;
    }
    let n = members.len() as f64;
    let fut_mean = members.iter().sum::<f64>() / n;
    let fut_sd = if members.len() < 2 {
        f64::NAN
    } else {
        let ss = members.iter().map(|&f| (f - fut_mean).powi(2)).sum::<f64>();
        (ss / (n - 1.0)).sqrt()
    };

    let ratio_override = baseline == 0.0 && fut_mean == 0.0;
    let ratio = if ratio_override { 1.0 } else { fut_mean / baseline };

    // Zero variance across {b, f_1..f_n}.
    let prob_override = members.iter().all(|&f| f == baseline);
    let prob_score = if prob_override {
        0.5
    } else {
        normal_cdf((fut_mean - baseline) / fut_sd)
    };

    let above = members.iter().filter(|&&f| baseline < f).count();
    let rank_score = above as f64 / n;

    Some(Summary {
        stats: EnsembleStats {
            fut_mean,
            fut_sd,
            ratio,
            prob_score,
            rank_score,
            members_used: members.len(),
        },
        ratio_override,
        prob_override,
    })
}

/// Summarise one table row holding a baseline and `n_members` projection samples.
pub fn summarize_row(
    row: &CellRow,
    n_members: usize,
    policy: MissingMemberPolicy,
) -> Result<RowOutcome, RowShapeError> {
    if row.samples.len() != n_members + 1 {
        return Err(RowShapeError {
            x: row.x,
            y: row.y,
            expected: n_members + 1,
            found: row.samples.len(),
        });
    }

    let baseline = row.baseline() as f64;
    let members: Vec<f64> = row
        .members()
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| v as f64)
        .collect();
    let excluded = n_members - members.len();

    if excluded > 0 && policy == MissingMemberPolicy::DropRow {
        return Ok(RowOutcome::Dropped);
    }
    if baseline.is_nan() {
        return Ok(RowOutcome::Empty { excluded });
    }
    Ok(match summarize(baseline, &members) {
        Some(summary) => RowOutcome::Summarized { summary, excluded },
        None => RowOutcome::Empty { excluded },
    })
}
