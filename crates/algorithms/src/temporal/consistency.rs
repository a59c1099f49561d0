//! Temporal filter 1: majority-vote consistency
//!
//! Removes urban cells that are isolated in time. The window depends on
//! the position of the year in the series:
//!
//! | Position              | Window            | Needed |
//! |-----------------------|-------------------|--------|
//! | first two years       | `y .. y+2`        | 2 of 3 |
//! | last two years        | `y-2 .. y`        | 2 of 3 |
//! | everything in between | `y-2 .. y+2`      | 3 of 5 |
//!
//! In stacks shorter than five years a year can be both "first" and
//! "last"; the forward window wins.
//!
//! Re-running the filter on its own output is not a no-op: removing a
//! cell can drop a neighbouring year's vote below the threshold. The
//! cascade runs it exactly once.

use urbano_core::{Algorithm, Error, RasterStack, Result, Stage};

use super::window::{vote_filter, VoteWindow};
use super::TemporalParams;
use crate::report::StageOutput;

pub const INITIAL: VoteWindow = VoteWindow::new("initial", 0, 2, 2);
pub const INTERMEDIATE: VoteWindow = VoteWindow::new("intermediate", 2, 2, 3);
pub const FINAL: VoteWindow = VoteWindow::new("final", 2, 0, 2);

/// Window for position `index` of a series of `len` years
pub fn consistency_window(index: usize, len: usize) -> VoteWindow {
    if index < 2 {
        INITIAL
    } else if index + 2 >= len {
        FINAL
    } else {
        INTERMEDIATE
    }
}

/// Apply the filter to a whole stack
pub fn temporal_consistency(input: &RasterStack<u8>, params: &TemporalParams) -> Result<StageOutput> {
    vote_filter(
        input,
        Stage::TemporalConsistency,
        params.urban_code,
        consistency_window,
    )
}

/// Apply the filter to one pixel's series
pub fn consistency_series(series: &[u8]) -> Vec<u8> {
    (0..series.len())
        .map(|i| consistency_window(i, series.len()).apply(series, i))
        .collect()
}

/// Temporal consistency filter (filter 1)
#[derive(Debug, Clone, Default)]
pub struct TemporalConsistency;

impl Algorithm for TemporalConsistency {
    type Input = RasterStack<u8>;
    type Output = StageOutput;
    type Params = TemporalParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "TemporalConsistency"
    }

    fn description(&self) -> &'static str {
        "Majority-vote removal of temporally isolated urban cells"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        temporal_consistency(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Diagnostic;

    fn run(first_year: i32, series: &[u8]) -> StageOutput {
        let stack = RasterStack::from_pixel_series(first_year, series).unwrap();
        temporal_consistency(&stack, &TemporalParams::default()).unwrap()
    }

    #[test]
    fn test_five_year_scenario() {
        let out = run(2000, &[1, 0, 1, 1, 0]);
        assert_eq!(out.stack.pixel_series(0, 0).unwrap(), vec![1, 0, 1, 1, 0]);
        assert_eq!(consistency_series(&[1, 0, 1, 1, 0]), vec![1, 0, 1, 1, 0]);

        let provenance = out.stack.provenance().unwrap();
        assert_eq!(provenance.rule_for(2000), Some("initial: 2000-2002, >=2 of 3"));
        assert_eq!(provenance.rule_for(2001), Some("initial: 2001-2003, >=2 of 3"));
        assert_eq!(provenance.rule_for(2002), Some("intermediate: 2000-2004, >=3 of 5"));
        assert_eq!(provenance.rule_for(2003), Some("final: 2001-2003, >=2 of 3"));
        assert_eq!(provenance.rule_for(2004), Some("final: 2002-2004, >=2 of 3"));
        assert!(out.report.diagnostics.is_empty());
    }

    #[test]
    fn test_interior_majority() {
        // the window around index 4 reads [1,1,1,0,0]
        let series = [0, 0, 1, 1, 1, 0, 0, 0, 0];
        let window = consistency_window(4, series.len());
        assert_eq!(window, INTERMEDIATE);
        assert_eq!(window.apply(&series, 4), 1);
        assert_eq!(consistency_series(&series)[4], 1);
    }

    #[test]
    fn test_first_year_never_looks_back() {
        let window = consistency_window(0, 10);
        assert_eq!(window.before, 0);
        assert_eq!(window.span(1990), 1990..=1992);
        // only later years vote for the first year
        assert_eq!(consistency_series(&[1, 0, 0, 1, 1, 1]), vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_removal_only() {
        let series = [0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 1, 1];
        let out = consistency_series(&series);
        for (a, b) in series.iter().zip(&out) {
            assert!(b <= a);
        }
    }

    #[test]
    fn test_not_idempotent() {
        let series = [0, 0, 1, 1, 0, 1, 0, 0, 0];
        let once = consistency_series(&series);
        assert_eq!(once, vec![0, 0, 0, 1, 0, 0, 0, 0, 0]);
        let twice = consistency_series(&once);
        assert_eq!(twice, vec![0; 9]);
        assert_ne!(once, twice);
    }

    #[test]
    fn test_stack_matches_series() {
        let series = [1, 1, 0, 1, 0, 0, 1, 1, 1, 0, 1];
        let out = run(1985, &series);
        assert_eq!(out.stack.pixel_series(0, 0).unwrap(), consistency_series(&series));
    }

    #[test]
    fn test_short_stack_reports_missing_years() {
        let out = run(2020, &[1, 1]);
        // 2020: initial window 2020-2022 with 2 votes, 2021: initial window too
        assert_eq!(out.stack.pixel_series(0, 0).unwrap(), vec![1, 0]);
        assert!(out
            .report
            .diagnostics
            .contains(&Diagnostic::MissingYearData { year: 2022, referenced_by: 2020 }));
    }
}
