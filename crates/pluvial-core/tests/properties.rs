use proptest::prelude::*;

use pluvial_core::stats::{normal_cdf, summarize};

proptest! {
    /// Rank is the exact fraction of members strictly above the baseline.
    #[test]
    fn rank_is_exact_strict_fraction(
        baseline in -1_000i32..1_000,
        members in prop::collection::vec(-1_000i32..1_000, 1..30),
    ) {
        let fs: Vec<f64> = members.iter().map(|&m| m as f64).collect();
        let s = summarize(baseline as f64, &fs).unwrap();
        let above = members.iter().filter(|&&m| m > baseline).count();
        prop_assert!((0.0..=1.0).contains(&s.stats.rank_score));
        prop_assert_eq!(s.stats.rank_score, above as f64 / members.len() as f64);
    }

    /// Identical baseline and members always score exactly one half.
    #[test]
    fn constant_ensemble_scores_half(value in -1.0e6f64..1.0e6, n in 1usize..20) {
        let s = summarize(value, &vec![value; n]).unwrap();
        prop_assert_eq!(s.stats.prob_score, 0.5);
        prop_assert!(!s.stats.prob_score.is_nan());
    }

    /// Zero baseline with an all-zero ensemble is "no change", never NaN.
    #[test]
    fn dry_cells_have_unit_ratio(n in 1usize..20) {
        let s = summarize(0.0, &vec![0.0; n]).unwrap();
        prop_assert_eq!(s.stats.ratio, 1.0);
    }

    /// For a fixed baseline and spread, a larger ensemble mean never lowers the score.
    #[test]
    fn prob_is_monotone_in_mean(
        baseline in -1_000i32..1_000,
        spread in 1i32..100,
        lo in -1_000i32..1_000,
        step in 0i32..500,
    ) {
        let hi = lo + step;
        let members = |m: i32| vec![(m - spread) as f64, (m + spread) as f64];
        let p_lo = summarize(baseline as f64, &members(lo)).unwrap();
        let p_hi = summarize(baseline as f64, &members(hi)).unwrap();
        prop_assert_eq!(p_lo.stats.fut_sd, p_hi.stats.fut_sd);
        prop_assert!(p_lo.stats.prob_score <= p_hi.stats.prob_score);
    }

    #[test]
    fn normal_cdf_is_a_monotone_probability(a in -10.0f64..10.0, b in -10.0f64..10.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (p_lo, p_hi) = (normal_cdf(lo), normal_cdf(hi));
        prop_assert!((0.0..=1.0).contains(&p_lo));
        prop_assert!(p_lo <= p_hi);
    }
}
