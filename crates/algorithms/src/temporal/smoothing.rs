//! Temporal filter 2: forward-looking smoothing
//!
//! A second removal pass over filter 1's output with its own windows:
//! years with three future years need 2 of `y .. y+3`; the two years
//! before the last need 2 of `y-2 .. y+1`; the last year needs only 1 of
//! `y-2 .. y`, so recent growth survives without future confirmation.

use urbano_core::{Algorithm, Error, RasterStack, Result, Stage};

use super::window::{vote_filter, VoteWindow};
use super::TemporalParams;
use crate::report::StageOutput;

pub const INTERMEDIATE: VoteWindow = VoteWindow::new("intermediate", 0, 3, 2);
pub const PENULTIMATE: VoteWindow = VoteWindow::new("penultimate", 2, 1, 2);
pub const LAST: VoteWindow = VoteWindow::new("last", 2, 0, 1);

pub fn smoothing_window(index: usize, len: usize) -> VoteWindow {
    if index + 3 < len {
        INTERMEDIATE
    } else if index + 1 < len {
        PENULTIMATE
    } else {
        LAST
    }
}

pub fn temporal_smoothing(input: &RasterStack<u8>, params: &TemporalParams) -> Result<StageOutput> {
    vote_filter(
        input,
        Stage::TemporalSmoothing,
        params.urban_code,
        smoothing_window,
    )
}

pub fn smoothing_series(series: &[u8]) -> Vec<u8> {
    (0..series.len())
        .map(|i| smoothing_window(i, series.len()).apply(series, i))
        .collect()
}

/// Temporal smoothing filter (filter 2)
#[derive(Debug, Clone, Default)]
pub struct TemporalSmoothing;

impl Algorithm for TemporalSmoothing {
    type Input = RasterStack<u8>;
    type Output = StageOutput;
    type Params = TemporalParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "TemporalSmoothing"
    }

    fn description(&self) -> &'static str {
        "Forward-looking majority vote with a permissive final year"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        temporal_smoothing(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_selection() {
        let len = 8;
        let labels: Vec<_> = (0..len).map(|i| smoothing_window(i, len).label).collect();
        assert_eq!(
            labels,
            vec![
                "intermediate",
                "intermediate",
                "intermediate",
                "intermediate",
                "intermediate",
                "penultimate",
                "penultimate",
                "last"
            ]
        );
    }

    #[test]
    fn test_single_urban_year_removed_mid_series() {
        assert_eq!(smoothing_series(&[0, 0, 1, 0, 0, 0, 0]), vec![0; 7]);
        assert_eq!(
            smoothing_series(&[0, 1, 0, 1, 0, 0, 0, 0]),
            vec![0, 1, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_last_year_permissive() {
        // a lone urban final year keeps itself
        assert_eq!(smoothing_series(&[0, 0, 0, 0, 0, 1]), vec![0, 0, 0, 0, 0, 1]);
        // a non-urban final year stays non-urban
        assert_eq!(smoothing_series(&[0, 0, 0, 1, 1, 0]), vec![0, 0, 0, 1, 1, 0]);
    }

    #[test]
    fn test_stack_rules_recorded() {
        let series = [1u8, 1, 0, 1, 1, 0, 1];
        let stack = RasterStack::from_pixel_series(2010, &series).unwrap();
        let out = temporal_smoothing(&stack, &TemporalParams::default()).unwrap();
        assert_eq!(out.stack.pixel_series(0, 0).unwrap(), smoothing_series(&series));

        let provenance = out.stack.provenance().unwrap();
        assert_eq!(provenance.rule_for(2010), Some("intermediate: 2010-2013, >=2 of 4"));
        assert_eq!(provenance.rule_for(2014), Some("penultimate: 2012-2015, >=2 of 4"));
        assert_eq!(provenance.rule_for(2016), Some("last: 2014-2016, >=1 of 3"));
    }
}
