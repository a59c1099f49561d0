//! Shared machinery of the temporal filters
//!
//! Every temporal stage maps one binary stack to a new one of the same
//! years. Years inside a stage are independent and run in parallel; the
//! stage output is only assembled once every year is done.

use std::ops::RangeInclusive;

use ndarray::{Array2, Zip};
use tracing::{debug, info};
use urbano_core::{Raster, RasterStack, Result, Stage, StageParameters};

use crate::maybe_rayon::*;
use crate::report::{finish_stage, Diagnostic, StageOutput, YearOutcome};

/// Majority vote over the years `[y - before, y + after]` around a target year y
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteWindow {
    /// Position name used in provenance, e.g. `"initial"`
    pub label: &'static str,
    pub before: usize,
    pub after: usize,
    /// Urban years needed in the window to keep the target
    pub min_votes: usize,
}

impl VoteWindow {
    pub const fn new(label: &'static str, before: usize, after: usize, min_votes: usize) -> Self {
        Self {
            label,
            before,
            after,
            min_votes,
        }
    }

    /// Number of years in the window
    pub fn len(&self) -> usize {
        self.before + self.after + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Years covered around `year`
    pub fn span(&self, year: i32) -> RangeInclusive<i32> {
        (year - self.before as i32)..=(year + self.after as i32)
    }

    /// e.g. `"initial: 1985-1987, >=2 of 3"`
    pub fn describe(&self, year: i32) -> String {
        let span = self.span(year);
        format!(
            "{}: {}-{}, >={} of {}",
            self.label,
            span.start(),
            span.end(),
            self.min_votes,
            self.len()
        )
    }

    /// Apply the window to position `index` of one pixel's series.
    /// Positions outside the series vote as not urban, and a target
    /// outside the series yields 0.
    pub fn apply(&self, series: &[u8], index: usize) -> u8 {
        let urban = |j: usize| series.get(j).is_some_and(|&v| v != 0);
        let start = index as isize - self.before as isize;
        let end = index as isize + self.after as isize;
        let votes = (start..=end)
            .filter(|&j| j >= 0 && urban(j as usize))
            .count();
        u8::from(urban(index) && votes >= self.min_votes)
    }
}

/// Layer of `year` as read while computing `target`.
///
/// Years outside the stack and zero-filled years are reported; both
/// read as not urban, so callers skip them.
pub(crate) fn window_layer<'a>(
    input: &'a RasterStack<u8>,
    year: i32,
    target: i32,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<&'a Raster<u8>> {
    match input.layer(year) {
        Some(layer) if !input.is_substituted(year) => Some(layer),
        _ => {
            diagnostics.push(Diagnostic::MissingYearData {
                year,
                referenced_by: target,
            });
            None
        }
    }
}

/// Run a removal-only majority-vote filter; `select(index, len)` picks
/// the window for each position.
pub(crate) fn vote_filter<S>(
    input: &RasterStack<u8>,
    stage: Stage,
    urban_code: u8,
    select: S,
) -> Result<StageOutput>
where
    S: Fn(usize, usize) -> VoteWindow + Sync + Send,
{
    let len = input.len();
    let years = input.years();
    info!(stage = %stage, years = %years, "running temporal filter");

    let outcomes = (0..len)
        .into_par_iter()
        .map(|index| -> Result<YearOutcome> {
            let year = years.year_at(index);
            let window = select(index, len);
            let rule = window.describe(year);
            debug!(stage = %stage, year, rule = %rule, "window selected");

            let current = &input.layers()[index];
            let mut votes = Array2::<u8>::zeros(current.shape());
            let mut diagnostics = Vec::new();
            for y in window.span(year) {
                if let Some(layer) = window_layer(input, y, year, &mut diagnostics) {
                    Zip::from(&mut votes)
                        .and(layer.data())
                        .for_each(|v, &x| *v += u8::from(x != 0));
                }
            }

            let min_votes = window.min_votes;
            let kept = Zip::from(current.data())
                .and(&votes)
                .map_collect(|&c, &v| u8::from(c != 0 && usize::from(v) >= min_votes));
            Ok(YearOutcome {
                layer: current.with_data(kept)?,
                rule,
                diagnostics,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    finish_stage(input, stage, StageParameters::TemporalWindow, urban_code, outcomes)
}
