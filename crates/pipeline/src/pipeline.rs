//! Filter cascade for one GID tile
//!
//! Stage order is fixed: spatial morphology filter, temporal filters 1
//! to 4, validity mask, then encoding to class codes. Each stage
//! materializes every year before the next one starts.
//!
//! In the spatial stage every year is its own unit. A unit whose layer
//! cannot be read or filtered is reported as a [`UnitFailure`] and its
//! year is zero-filled, so the temporal filters see it as missing data.
//! Misaligned grids abort the whole tile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use urbano_algorithms::mask::apply_validity_mask;
use urbano_algorithms::report::{Diagnostic, StageOutput, StageReport, YearStats};
use urbano_algorithms::spatial::{binarize, clear_nodata, spatial_filter, Gid, Region, ThresholdTable};
use urbano_algorithms::temporal::temporal_cascade;
use urbano_core::{Provenance, Raster, RasterStack, Stage};
use urbano_parallel::{ParallelStrategy, TiledProcessor};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::product::{check_continuity, ContinuityReport};
use crate::source::ProbabilitySource;

/// A unit of work that failed: one year of a tile, or the whole tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub gid: Gid,
    /// `None` when the whole tile failed
    pub year: Option<i32>,
    pub reason: String,
}

impl UnitFailure {
    pub fn year(gid: Gid, year: i32, reason: impl Into<String>) -> Self {
        Self {
            gid,
            year: Some(year),
            reason: reason.into(),
        }
    }

    pub fn tile(gid: Gid, reason: impl Into<String>) -> Self {
        Self {
            gid,
            year: None,
            reason: reason.into(),
        }
    }
}

/// Every stage output of one tile
#[derive(Debug, Clone)]
pub struct TileRun {
    pub gid: Gid,
    pub region: Region,
    /// Outputs in cascade order, spatial filter first, validity mask last
    pub stages: Vec<StageOutput>,
    /// Masked stack encoded as {0, urban code}
    pub product: RasterStack<u8>,
    pub failures: Vec<UnitFailure>,
    pub continuity: ContinuityReport,
}

impl TileRun {
    pub fn stage(&self, stage: Stage) -> Option<&StageOutput> {
        self.stages.iter().find(|s| s.report.stage == stage)
    }

    pub fn reports(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().map(|s| &s.report)
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.reports().flat_map(|r| r.diagnostics.iter())
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.continuity.is_continuous()
    }
}

/// Label recorded in provenance, e.g. `"GID 72 (Cuyo)"`
pub fn region_label(gid: Gid, region: Region) -> String {
    format!("GID {gid} ({region})")
}

/// Outcome of one (year, GID) unit of the spatial stage
struct SpatialYear {
    year: i32,
    layer: Option<Raster<u8>>,
    rule: String,
    stats: Option<YearStats>,
    diagnostics: Vec<Diagnostic>,
    failure: Option<UnitFailure>,
}

impl SpatialYear {
    fn absent(year: i32, rule: String, diagnostics: Vec<Diagnostic>, failure: Option<UnitFailure>) -> Self {
        Self {
            year,
            layer: None,
            rule,
            stats: None,
            diagnostics,
            failure,
        }
    }
}

/// Runs the cascade for single tiles
#[derive(Debug, Clone, Copy)]
pub struct TilePipeline<'a> {
    config: &'a PipelineConfig,
    thresholds: &'a ThresholdTable,
}

impl<'a> TilePipeline<'a> {
    pub fn new(config: &'a PipelineConfig, thresholds: &'a ThresholdTable) -> Self {
        Self { config, thresholds }
    }

    pub fn config(&self) -> &PipelineConfig {
        self.config
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        self.thresholds
    }

    /// Run every stage for `gid`
    pub fn run<S: ProbabilitySource + ?Sized>(&self, gid: Gid, source: &S) -> Result<TileRun> {
        let config = self.config;
        let years = config.years()?;
        let region = self.thresholds.region(gid);
        info!(gid, region = %region, years = %years, "processing tile");

        let validity = source.validity_mask(gid)?;
        let (spatial, failures) = self.spatial_stage(gid, region, source, &validity)?;
        let continuity = check_continuity(&spatial.stack, years);

        let mut stages = vec![spatial];
        let temporal = temporal_cascade(&stages[0].stack, &config.temporal())?;
        stages.extend(temporal);

        let consolidated = &stages[stages.len() - 1].stack;
        let masked = apply_validity_mask(consolidated, &validity, &config.validity())?;
        let product = config.codes.encode_stack(&masked.stack)?;
        stages.push(masked);

        info!(
            gid,
            failures = failures.len(),
            missing_years = continuity.missing.len(),
            "tile complete"
        );
        Ok(TileRun {
            gid,
            region,
            stages,
            product,
            failures,
            continuity,
        })
    }

    /// Threshold and filter every year of the tile
    fn spatial_stage<S: ProbabilitySource + ?Sized>(
        &self,
        gid: Gid,
        region: Region,
        source: &S,
        validity: &Raster<u8>,
    ) -> Result<(StageOutput, Vec<UnitFailure>)> {
        let config = self.config;
        let years = config.years()?;
        info!(stage = %Stage::SpatialFilter, gid, years = %years, "running spatial filter");

        let processor = TiledProcessor::new(config.tile_size, config.spatial.halo())
            .with_mode(config.nested_mode());

        let units = config
            .mode
            .par_map(0..years.len(), |i| -> Result<SpatialYear> {
                self.filter_year(gid, years.year_at(i), source, validity, &processor)
            })?
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let mut provenance = Provenance::new(
            Stage::SpatialFilter,
            years,
            config.codes.urban,
            config.spatial.provenance(),
        )
        .with_region(region_label(gid, region));
        let mut report = StageReport::new(Stage::SpatialFilter);
        let mut layers = BTreeMap::new();
        let mut failures = Vec::new();

        for unit in units {
            provenance.push_rule(unit.year, unit.rule);
            for diagnostic in unit.diagnostics {
                report.push(diagnostic);
            }
            if let Some(stats) = unit.stats {
                report.record_year(stats);
            }
            if let Some(layer) = unit.layer {
                layers.insert(unit.year, layer);
            }
            failures.extend(unit.failure);
        }

        let template = validity.with_same_meta::<u8>();
        let stack = RasterStack::from_partial(years, layers, &template)?.with_provenance(provenance);
        info!(
            stage = %Stage::SpatialFilter,
            gid,
            added = report.total_added(),
            removed = report.total_removed(),
            diagnostics = report.diagnostics.len(),
            "stage complete"
        );
        Ok((StageOutput { stack, report }, failures))
    }

    fn filter_year<S: ProbabilitySource + ?Sized>(
        &self,
        gid: Gid,
        year: i32,
        source: &S,
        validity: &Raster<u8>,
        processor: &TiledProcessor,
    ) -> Result<SpatialYear> {
        let lookup = self.thresholds.lookup(gid, year);
        let threshold = lookup.threshold;
        let mut diagnostics: Vec<Diagnostic> = lookup.diagnostic.into_iter().collect();

        let probability = match source.probability(gid, year) {
            Ok(Some(probability)) => probability,
            Ok(None) => {
                diagnostics.push(Diagnostic::MissingYearData {
                    year,
                    referenced_by: year,
                });
                return Ok(SpatialYear::absent(year, "missing: zero-filled".into(), diagnostics, None));
            }
            Err(error) => {
                let failure = UnitFailure::year(gid, year, error.to_string());
                return Ok(SpatialYear::absent(year, "failed: zero-filled".into(), diagnostics, Some(failure)));
            }
        };
        validity.ensure_coregistered(&probability, &format!("probability layer {year}"))?;

        let binarized = binarize(&probability, threshold);
        let params = &self.config.spatial;
        let tiled = processor.process(&binarized.mask, |window| spatial_filter(window, params))?;
        if let Some(first) = tiled.failures.first() {
            let reason = format!(
                "{} of {} blocks failed, first at ({}, {}): {}",
                tiled.failures.len(),
                processor.tiles(probability.rows(), probability.cols()).len(),
                first.tile.row,
                first.tile.col,
                first.error
            );
            let failure = UnitFailure::year(gid, year, reason);
            return Ok(SpatialYear::absent(year, "failed: zero-filled".into(), diagnostics, Some(failure)));
        }

        let urban = clear_nodata(&tiled.raster, &binarized.nodata)?;
        let stats = YearStats::compare(year, &binarized.mask, &urban);
        debug!(gid, year, threshold, before = stats.urban_before, after = stats.urban_after, "filtered year");

        Ok(SpatialYear {
            year,
            layer: Some(urban),
            rule: params.describe(threshold),
            stats: Some(stats),
            diagnostics,
            failure: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::source::MemorySource;
    use urbano_core::Error;
    use urbano_parallel::ProcessingMode;

    fn config(start: i32, end: i32) -> PipelineConfig {
        PipelineConfig {
            start_year: start,
            end_year: end,
            tile_size: 8,
            mode: ProcessingMode::Sequential,
            ..Default::default()
        }
    }

    /// 12x12 grid with a 6x6 block of high probability
    fn block(prob: u8) -> Raster<u8> {
        let mut raster = Raster::filled(12, 12, 10u8);
        for r in 3..9 {
            for c in 3..9 {
                raster.set(r, c, prob).unwrap();
            }
        }
        raster
    }

    #[test]
    fn test_region_label() {
        assert_eq!(region_label(72, Region::Cuyo), "GID 72 (Cuyo)");
    }

    #[test]
    fn test_full_cascade_on_stable_block() {
        let config = config(2000, 2004);
        let table = config.thresholds();
        let mut source = MemorySource::new().with_mask(72, Raster::filled(12, 12, 1));
        for year in 2000..=2004 {
            source.insert_layer(72, year, block(90));
        }

        let run = TilePipeline::new(&config, &table).run(72, &source).unwrap();
        assert!(run.is_complete());
        assert_eq!(run.stages.len(), 6);
        let stages: Vec<_> = run.reports().map(|r| r.stage).collect();
        assert_eq!(stages, Stage::CASCADE.to_vec());

        for year in 2000..=2004 {
            let layer = run.product.layer(year).unwrap();
            assert_eq!(layer.get(5, 5).unwrap(), 24);
            assert_eq!(layer.get(0, 0).unwrap(), 0);
        }
        let provenance = run.product.provenance().unwrap();
        assert_eq!(provenance.stage, Stage::FinalSpatialMask);
        assert_eq!(provenance.region, "GID 72 (Cuyo)");
        assert_eq!(provenance.urban_code, 24);
    }

    #[test]
    fn test_missing_year_is_zero_filled_and_flagged() {
        let config = config(2000, 2004);
        let table = config.thresholds();
        let mut source = MemorySource::new().with_mask(72, Raster::filled(12, 12, 1));
        for year in [2000, 2001, 2003, 2004] {
            source.insert_layer(72, year, block(90));
        }

        let run = TilePipeline::new(&config, &table).run(72, &source).unwrap();
        assert!(run.failures.is_empty());
        assert_eq!(run.continuity.missing, vec![2002]);

        let spatial = run.stage(Stage::SpatialFilter).unwrap();
        assert!(spatial.stack.is_substituted(2002));
        assert_eq!(spatial.stack.provenance().unwrap().rule_for(2002), Some("missing: zero-filled"));

        // gap fill restores the missing interior year
        let filled = run.stage(Stage::TemporalGapFill).unwrap();
        assert_eq!(filled.stack.layer(2002).unwrap().get(5, 5).unwrap(), 1);
        assert!(run
            .diagnostics()
            .any(|d| matches!(d, Diagnostic::MissingYearData { year: 2002, .. })));
    }

    #[test]
    fn test_source_failure_isolated_to_year() {
        struct Flaky(MemorySource);
        impl ProbabilitySource for Flaky {
            fn probability(&self, gid: Gid, year: i32) -> Result<Option<Raster<u8>>> {
                if year == 2001 {
                    return Err(PipelineError::Source {
                        gid,
                        reason: "timeout".into(),
                    });
                }
                self.0.probability(gid, year)
            }
            fn validity_mask(&self, gid: Gid) -> Result<Raster<u8>> {
                self.0.validity_mask(gid)
            }
        }

        let config = config(2000, 2003);
        let table = config.thresholds();
        let mut inner = MemorySource::new().with_mask(72, Raster::filled(12, 12, 1));
        for year in 2000..=2003 {
            inner.insert_layer(72, year, block(90));
        }

        let run = TilePipeline::new(&config, &table).run(72, &Flaky(inner)).unwrap();
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].year, Some(2001));
        assert!(run.failures[0].reason.contains("timeout"));
        let spatial = run.stage(Stage::SpatialFilter).unwrap();
        assert_eq!(spatial.stack.layer(2000).unwrap().get(5, 5).unwrap(), 1);
        assert_eq!(spatial.stack.layer(2001).unwrap().count_set(), 0);
    }

    #[test]
    fn test_degenerate_threshold_falls_back() {
        // GID 195 is configured at 80 after 2004; 80 is degenerate here
        let config = PipelineConfig {
            degenerate_threshold: 80,
            include_patagonia: true,
            ..config(2005, 2006)
        };
        let table = config.thresholds();
        let source = MemorySource::new()
            .with_mask(195, Raster::filled(12, 12, 1))
            .with_layer(195, 2005, block(60))
            .with_layer(195, 2006, block(60));

        let run = TilePipeline::new(&config, &table).run(195, &source).unwrap();
        let spatial = run.stage(Stage::SpatialFilter).unwrap();
        assert!(spatial
            .report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::DegenerateThreshold { configured: 80, fallback: 50, .. })));
        // 60 passes the fallback of 50
        assert_eq!(spatial.stack.layer(2005).unwrap().get(5, 5).unwrap(), 1);
    }

    #[test]
    fn test_misaligned_layer_aborts_tile() {
        let config = config(2000, 2001);
        let table = config.thresholds();
        let source = MemorySource::new()
            .with_mask(72, Raster::filled(12, 12, 1))
            .with_layer(72, 2000, block(90))
            .with_layer(72, 2001, Raster::filled(10, 12, 90));

        let err = TilePipeline::new(&config, &table).run(72, &source).unwrap_err();
        assert!(matches!(err, PipelineError::Core(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_nodata_cells_never_urban() {
        let config = config(2000, 2000);
        let table = config.thresholds();
        let mut probability = block(90);
        probability.set(5, 5, 255).unwrap();
        probability.set_nodata(Some(255));
        let source = MemorySource::new()
            .with_mask(72, Raster::filled(12, 12, 1))
            .with_layer(72, 2000, probability);

        let run = TilePipeline::new(&config, &table).run(72, &source).unwrap();
        let spatial = run.stage(Stage::SpatialFilter).unwrap();
        let layer = spatial.stack.layer(2000).unwrap();
        assert_eq!(layer.get(5, 5).unwrap(), 0);
        assert_eq!(layer.get(4, 4).unwrap(), 1);
    }
}
