//! Temporal filter 3: one-year gap filling
//!
//! The only additive temporal pass. An interior year that is not urban
//! between two urban years becomes urban. The last year becomes urban
//! whenever the year before it is. The first year keeps its value
//! (urban, or urban and persisting into the next year).

use ndarray::{Array2, Zip};
use tracing::{debug, info};
use urbano_core::{Algorithm, Error, Raster, RasterStack, Result, Stage, StageParameters};

use super::window::window_layer;
use super::TemporalParams;
use crate::maybe_rayon::*;
use crate::report::{finish_stage, StageOutput, YearOutcome};

/// Rule applied at a position of the series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapRule {
    /// `y OR (y AND y+1)`
    First,
    /// `y OR (y-1 AND NOT y AND y+1)`
    Interior,
    /// `y OR y-1`
    Last,
}

impl GapRule {
    /// Rule for position `index`; the first-year rule wins in a one-year series
    pub fn at(index: usize, len: usize) -> Self {
        if index == 0 {
            GapRule::First
        } else if index + 1 == len {
            GapRule::Last
        } else {
            GapRule::Interior
        }
    }

    pub fn apply(&self, prev: bool, current: bool, next: bool) -> bool {
        match self {
            GapRule::First => current || (current && next),
            GapRule::Interior => current || (prev && !current && next),
            GapRule::Last => current || prev,
        }
    }

    fn reads_prev(&self) -> bool {
        !matches!(self, GapRule::First)
    }

    fn reads_next(&self) -> bool {
        !matches!(self, GapRule::Last)
    }

    pub fn describe(&self, year: i32) -> String {
        let (p, n) = (year - 1, year + 1);
        match self {
            GapRule::First => format!("first: {year} OR ({year} AND {n})"),
            GapRule::Interior => format!("interior: {year} OR ({p} AND NOT {year} AND {n})"),
            GapRule::Last => format!("last: {year} OR {p}"),
        }
    }
}

fn fill_year(
    current: &Raster<u8>,
    prev: Option<&Raster<u8>>,
    next: Option<&Raster<u8>>,
    rule: GapRule,
) -> Result<Raster<u8>> {
    let zeros = Array2::<u8>::zeros(current.shape());
    let prev = prev.map_or(zeros.view(), |r| r.view());
    let next = next.map_or(zeros.view(), |r| r.view());
    let data = Zip::from(current.data())
        .and(prev)
        .and(next)
        .map_collect(|&c, &p, &n| u8::from(rule.apply(p != 0, c != 0, n != 0)));
    current.with_data(data)
}

pub fn temporal_gap_fill(input: &RasterStack<u8>, params: &TemporalParams) -> Result<StageOutput> {
    let len = input.len();
    let years = input.years();
    info!(stage = %Stage::TemporalGapFill, years = %years, "running temporal filter");

    let outcomes = (0..len)
        .into_par_iter()
        .map(|index| -> Result<YearOutcome> {
            let year = years.year_at(index);
            let rule = GapRule::at(index, len);
            debug!(year, rule = ?rule, "gap fill rule selected");

            let mut diagnostics = Vec::new();
            let prev = if rule.reads_prev() {
                window_layer(input, year - 1, year, &mut diagnostics)
            } else {
                None
            };
            let next = if rule.reads_next() {
                window_layer(input, year + 1, year, &mut diagnostics)
            } else {
                None
            };
            Ok(YearOutcome {
                layer: fill_year(&input.layers()[index], prev, next, rule)?,
                rule: rule.describe(year),
                diagnostics,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    finish_stage(
        input,
        Stage::TemporalGapFill,
        StageParameters::GapFill,
        params.urban_code,
        outcomes,
    )
}

pub fn gap_fill_series(series: &[u8]) -> Vec<u8> {
    let at = |j: isize| j >= 0 && series.get(j as usize).is_some_and(|&v| v != 0);
    (0..series.len())
        .map(|i| {
            let j = i as isize;
            let rule = GapRule::at(i, series.len());
            u8::from(rule.apply(at(j - 1), at(j), at(j + 1)))
        })
        .collect()
}

/// Temporal gap-fill filter (filter 3)
#[derive(Debug, Clone, Default)]
pub struct TemporalGapFill;

impl Algorithm for TemporalGapFill {
    type Input = RasterStack<u8>;
    type Output = StageOutput;
    type Params = TemporalParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "TemporalGapFill"
    }

    fn description(&self) -> &'static str {
        "Fill single-year gaps and carry the previous year into the last"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        temporal_gap_fill(&input, &params)
    }
}
