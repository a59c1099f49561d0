//! Temporal filter 4: monotonic consolidation
//!
//! Once urban, always urban: every year becomes the running maximum of
//! all years up to it. The first year is then re-checked against the
//! second year of the *input*. An urban first year followed by a
//! non-urban second year is dropped, while later years keep the urban
//! value the cumulative maximum already gave them. This is the only way
//! the output can decrease along the years.
//!
//! The pass is aggressive and inflates apparent growth. It is applied as
//! is; nothing downstream compensates.

use ndarray::Zip;
use tracing::info;
use urbano_core::{Algorithm, Error, RasterStack, Result, Stage, StageParameters};

use super::TemporalParams;
use crate::report::{finish_stage, Diagnostic, StageOutput, YearOutcome};

pub fn temporal_consolidation(
    input: &RasterStack<u8>,
    params: &TemporalParams,
) -> Result<StageOutput> {
    let years = input.years();
    let first_year = years.first();
    let retract = input.len() >= 2;
    info!(stage = %Stage::TemporalConsolidation, years = %years, "running temporal filter");

    let mut running = input.template().with_same_meta::<u8>();
    let mut outcomes = Vec::with_capacity(input.len());
    for (year, layer) in input.iter() {
        let mut diagnostics = Vec::new();
        if input.is_substituted(year) {
            diagnostics.push(Diagnostic::MissingYearData {
                year,
                referenced_by: year,
            });
        }
        Zip::from(running.data_mut())
            .and(layer.data())
            .for_each(|r, &v| *r = u8::from(*r != 0 || v != 0));
        outcomes.push(YearOutcome {
            layer: running.clone(),
            rule: format!("cumulative max {first_year}-{year}"),
            diagnostics,
        });
    }

    if retract {
        let second = first_year + 1;
        let first = &input.layers()[0];
        let next = &input.layers()[1];
        let validated = first.zip_map(next, "first-year retraction", |a, b| {
            u8::from(a != 0 && b != 0)
        })?;
        if input.is_substituted(second) {
            outcomes[0].diagnostics.push(Diagnostic::MissingYearData {
                year: second,
                referenced_by: first_year,
            });
        }
        outcomes[0].layer = validated;
        outcomes[0].rule = format!(
            "cumulative max {first_year}-{first_year}; retract where {first_year} urban and {second} not"
        );
    }

    finish_stage(
        input,
        Stage::TemporalConsolidation,
        StageParameters::Consolidation {
            first_year_retraction: retract,
        },
        params.urban_code,
        outcomes,
    )
}

pub fn consolidation_series(series: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = series
        .iter()
        .scan(0u8, |running, &v| {
            *running = u8::from(*running != 0 || v != 0);
            Some(*running)
        })
        .collect();
    if series.len() >= 2 {
        out[0] = u8::from(series[0] != 0 && series[1] != 0);
    }
    out
}

/// Temporal consolidation filter (filter 4)
#[derive(Debug, Clone, Default)]
pub struct TemporalConsolidation;

impl Algorithm for TemporalConsolidation {
    type Input = RasterStack<u8>;
    type Output = StageOutput;
    type Params = TemporalParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "TemporalConsolidation"
    }

    fn description(&self) -> &'static str {
        "Cumulative maximum over years with first-year retraction"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        temporal_consolidation(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_monotonic_after_first(series: &[u8]) -> bool {
        series[1..].windows(2).all(|w| w[1] >= w[0])
    }

    #[test]
    fn test_cumulative_max() {
        assert_eq!(consolidation_series(&[0, 1, 0, 0, 1, 0]), vec![0, 1, 1, 1, 1, 1]);
        assert_eq!(consolidation_series(&[1, 1, 0, 0]), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_first_year_retraction_exception() {
        // the retracted first year sits below the second year
        let out = consolidation_series(&[1, 0, 0]);
        assert_eq!(out, vec![0, 1, 1]);
        assert!(out[0] < out[1]);
    }

    #[test]
    fn test_monotonic() {
        let inputs: [&[u8]; 4] = [
            &[1, 0, 1, 0, 1, 0, 1],
            &[0, 1, 1, 0, 0, 1, 0],
            &[1, 0, 0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0, 0, 1],
        ];
        for series in inputs {
            let out = consolidation_series(series);
            assert!(is_monotonic_after_first(&out));
            assert!(out[0] <= out[1]);
        }
    }

    #[test]
    fn test_single_year_not_retracted() {
        assert_eq!(consolidation_series(&[1]), vec![1]);
        let stack = RasterStack::from_pixel_series(2024, &[1u8]).unwrap();
        let out = temporal_consolidation(&stack, &TemporalParams::default()).unwrap();
        assert_eq!(out.stack.pixel_series(0, 0).unwrap(), vec![1]);
    }

    #[test]
    fn test_stack_matches_series() {
        let series = [1u8, 0, 0, 1, 0, 0, 1, 0];
        let stack = RasterStack::from_pixel_series(2000, &series).unwrap();
        let out = temporal_consolidation(&stack, &TemporalParams::default()).unwrap();
        assert_eq!(out.stack.pixel_series(0, 0).unwrap(), consolidation_series(&series));
        assert_eq!(out.report.stats_for(2000).unwrap().removed, 1);

        let provenance = out.stack.provenance().unwrap();
        assert_eq!(provenance.rule_for(2003), Some("cumulative max 2000-2003"));
        assert_eq!(
            provenance.parameters,
            StageParameters::Consolidation { first_year_retraction: true }
        );
    }
}
