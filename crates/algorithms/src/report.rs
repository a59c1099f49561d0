//! Stage reports: per-year comparative statistics and data-quality diagnostics
//!
//! None of the conditions recorded here stop a stage. Each diagnostic
//! is logged as a warning when it is recorded and kept in the report for
//! manual review.

use std::fmt;

use ndarray::Zip;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use urbano_core::{Provenance, Raster, RasterStack, Result, Stage, StageParameters};

use crate::spatial::Gid;

/// A non-fatal data-quality condition raised while running a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A window referenced a year with no layer; it voted as not urban
    MissingYearData { year: i32, referenced_by: i32 },
    /// No threshold configured for this tile and year
    MissingThreshold { gid: Gid, year: i32, fallback: u8 },
    /// A configured threshold would exclude nearly every pixel
    DegenerateThreshold {
        gid: Gid,
        year: i32,
        configured: u8,
        fallback: u8,
    },
    /// Output layer is all zero although its input was not
    EmptyOutput {
        stage: Stage,
        year: i32,
        input_urban: usize,
    },
}

impl Diagnostic {
    /// Log the diagnostic at warning level
    pub fn emit(&self) {
        warn!("{}", self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingYearData { year, referenced_by } => write!(
                f,
                "missing layer for {year} (window of {referenced_by}); counted as not urban"
            ),
            Diagnostic::MissingThreshold { gid, year, fallback } => write!(
                f,
                "no threshold for GID {gid} in {year}; using {fallback}"
            ),
            Diagnostic::DegenerateThreshold {
                gid,
                year,
                configured,
                fallback,
            } => write!(
                f,
                "threshold {configured} for GID {gid} in {year} is too high; using {fallback}"
            ),
            Diagnostic::EmptyOutput {
                stage,
                year,
                input_urban,
            } => write!(
                f,
                "{stage} produced no urban pixels for {year} from {input_urban} input pixels"
            ),
        }
    }
}

/// Urban pixel counts for one year before and after a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearStats {
    pub year: i32,
    pub urban_before: usize,
    pub urban_after: usize,
    /// Cells not urban before and urban after
    pub added: usize,
    /// Cells urban before and not urban after
    pub removed: usize,
}

impl YearStats {
    /// Compare two co-registered binary layers
    pub fn compare(year: i32, before: &Raster<u8>, after: &Raster<u8>) -> Self {
        let mut stats = YearStats {
            year,
            urban_before: 0,
            urban_after: 0,
            added: 0,
            removed: 0,
        };
        Zip::from(before.data())
            .and(after.data())
            .for_each(|&b, &a| match (b != 0, a != 0) {
                (true, true) => {
                    stats.urban_before += 1;
                    stats.urban_after += 1;
                }
                (true, false) => {
                    stats.urban_before += 1;
                    stats.removed += 1;
                }
                (false, true) => {
                    stats.urban_after += 1;
                    stats.added += 1;
                }
                (false, false) => {}
            });
        stats
    }

    /// Net change in urban pixels as a percentage of the input
    pub fn change_percent(&self) -> Option<f64> {
        (self.urban_before > 0).then(|| {
            (self.urban_after as f64 - self.urban_before as f64) / self.urban_before as f64 * 100.0
        })
    }
}

/// Statistics and diagnostics collected while running one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub years: Vec<YearStats>,
    pub diagnostics: Vec<Diagnostic>,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            years: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Record and log a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
    }

    /// Record a year's statistics, flagging an emptied layer
    pub fn record_year(&mut self, stats: YearStats) {
        if stats.urban_before > 0 && stats.urban_after == 0 {
            self.push(Diagnostic::EmptyOutput {
                stage: self.stage,
                year: stats.year,
                input_urban: stats.urban_before,
            });
        }
        self.years.push(stats);
    }

    /// Compare every year of two stacks covering the same years
    pub fn compare_stacks(&mut self, input: &RasterStack<u8>, output: &RasterStack<u8>) {
        for ((year, before), after) in input.iter().zip(output.layers()) {
            self.record_year(YearStats::compare(year, before, after));
        }
    }

    pub fn stats_for(&self, year: i32) -> Option<&YearStats> {
        self.years.iter().find(|s| s.year == year)
    }

    pub fn total_added(&self) -> usize {
        self.years.iter().map(|s| s.added).sum()
    }

    pub fn total_removed(&self) -> usize {
        self.years.iter().map(|s| s.removed).sum()
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Years flagged as emptied by this stage
    pub fn empty_output_years(&self) -> Vec<i32> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::EmptyOutput { year, .. } => Some(*year),
                _ => None,
            })
            .collect()
    }
}

/// A stage's output stack together with its report
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub stack: RasterStack<u8>,
    pub report: StageReport,
}

/// One year of a stage's output
#[derive(Debug, Clone)]
pub(crate) struct YearOutcome {
    pub layer: Raster<u8>,
    pub rule: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Assemble per-year outcomes into the stage output stack and report
pub(crate) fn finish_stage(
    input: &RasterStack<u8>,
    stage: Stage,
    parameters: StageParameters,
    urban_code: u8,
    outcomes: Vec<YearOutcome>,
) -> Result<StageOutput> {
    let region = input
        .provenance()
        .map(|p| p.region.clone())
        .unwrap_or_default();
    let mut provenance =
        Provenance::new(stage, input.years(), urban_code, parameters).with_region(region);
    let mut report = StageReport::new(stage);
    let mut layers = Vec::with_capacity(outcomes.len());

    for (year, outcome) in input.years().iter().zip(outcomes) {
        provenance.push_rule(year, outcome.rule);
        for diagnostic in outcome.diagnostics {
            report.push(diagnostic);
        }
        layers.push(outcome.layer);
    }

    let stack = RasterStack::new(input.first_year(), layers)?
        .with_substituted(input.substituted_years())
        .with_provenance(provenance);
    report.compare_stacks(input, &stack);
    info!(
        stage = %stage,
        added = report.total_added(),
        removed = report.total_removed(),
        "stage complete"
    );
    Ok(StageOutput { stack, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_year_stats_counts() {
        let before = Raster::from_vec(vec![1u8, 1, 0, 0], 2, 2).unwrap();
        let after = Raster::from_vec(vec![1u8, 0, 1, 0], 2, 2).unwrap();
        let stats = YearStats::compare(2000, &before, &after);
        assert_eq!(stats.urban_before, 2);
        assert_eq!(stats.urban_after, 2);
        assert_eq!(stats.added, 1);
        assert_eq!(stats.removed, 1);
        assert_relative_eq!(stats.change_percent().unwrap(), 0.0);
    }

    #[test]
    fn test_empty_output_flagged() {
        let before = Raster::from_vec(vec![1u8, 1, 0, 0], 2, 2).unwrap();
        let after: Raster<u8> = Raster::new(2, 2);
        let mut report = StageReport::new(Stage::TemporalConsistency);
        report.record_year(YearStats::compare(2001, &before, &after));
        report.record_year(YearStats::compare(2002, &after, &after));

        assert_eq!(report.empty_output_years(), vec![2001]);
        assert_eq!(report.total_removed(), 2);
        assert!(report.stats_for(2002).unwrap().change_percent().is_none());
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::DegenerateThreshold {
            gid: 195,
            year: 2010,
            configured: 96,
            fallback: 50,
        };
        assert_eq!(
            d.to_string(),
            "threshold 96 for GID 195 in 2010 is too high; using 50"
        );
    }
}
