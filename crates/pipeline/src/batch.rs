//! Batch execution over all GID tiles
//!
//! Tiles are independent. A tile that fails is reported and the others
//! keep going; a failed year inside a tile is reported by the tile run.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use urbano_algorithms::report::StageReport;
use urbano_algorithms::spatial::{Gid, Region, ThresholdTable};
use urbano_core::YearRange;
use urbano_parallel::ParallelStrategy;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::{TilePipeline, TileRun, UnitFailure};
use crate::product::{national_mosaic, Mosaic};
use crate::source::{ProbabilitySource, StackSink};

/// What a batch did for one tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSummary {
    pub gid: Gid,
    pub region: Region,
    pub reports: Vec<StageReport>,
    pub missing_years: Vec<i32>,
}

impl TileSummary {
    fn from_run(run: &TileRun) -> Self {
        Self {
            gid: run.gid,
            region: run.region,
            reports: run.reports().cloned().collect(),
            missing_years: run.continuity.missing.clone(),
        }
    }
}

/// Audit record of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub years: YearRange,
    pub tiles: Vec<TileSummary>,
    /// Failed tiles and failed (year, tile) units
    pub failures: Vec<UnitFailure>,
}

impl BatchReport {
    /// GIDs that produced no output at all
    pub fn failed_tiles(&self) -> Vec<Gid> {
        self.failures
            .iter()
            .filter(|f| f.year.is_none())
            .map(|f| f.gid)
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.tiles.iter().all(|t| t.missing_years.is_empty())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Tile runs and the report of a batch
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub runs: Vec<TileRun>,
    pub report: BatchReport,
}

impl BatchOutput {
    pub fn run(&self, gid: Gid) -> Option<&TileRun> {
        self.runs.iter().find(|r| r.gid == gid)
    }

    /// National mosaic of `year` over every tile of the batch
    pub fn mosaic(&self, year: i32) -> Result<Mosaic> {
        let mut mosaic = national_mosaic(year, self.runs.iter().map(|r| (r.gid, &r.product)))?;
        mosaic.failed.extend(self.report.failed_tiles());
        mosaic.failed.sort_unstable();
        Ok(mosaic)
    }

    /// National mosaics for every year of the batch
    pub fn mosaics(&self) -> Result<Vec<Mosaic>> {
        let years: Vec<i32> = self.report.years.iter().collect();
        years.into_par_iter().map(|year| self.mosaic(year)).collect()
    }
}

/// Run the cascade on every selected tile and persist the products
pub fn run_batch<S, K>(
    config: &PipelineConfig,
    thresholds: &ThresholdTable,
    source: &S,
    sink: &K,
) -> Result<BatchOutput>
where
    S: ProbabilitySource + ?Sized,
    K: StackSink + ?Sized,
{
    config.validate()?;
    let years = config.years()?;
    let gids = thresholds.gids(config.include_patagonia);
    info!(
        tiles = gids.len(),
        years = %years,
        include_patagonia = config.include_patagonia,
        "starting batch"
    );

    // tiles take the configured mode; years inside a tile nest on its pool
    let tile_config = PipelineConfig {
        mode: config.nested_mode(),
        ..config.clone()
    };
    let pipeline = TilePipeline::new(&tile_config, thresholds);

    let results = config.mode.par_map(0..gids.len(), |i| -> Result<TileRun> {
        let run = pipeline.run(gids[i], source)?;
        persist(&run, config, sink)?;
        Ok(run)
    })?;

    let mut runs = Vec::with_capacity(gids.len());
    let mut tiles = Vec::with_capacity(gids.len());
    let mut failures = Vec::new();
    for (&gid, result) in gids.iter().zip(results) {
        match result {
            Ok(run) => {
                tiles.push(TileSummary::from_run(&run));
                failures.extend(run.failures.iter().cloned());
                runs.push(run);
            }
            Err(e) => {
                error!(gid, error = %e, "tile failed");
                failures.push(UnitFailure::tile(gid, e.to_string()));
            }
        }
    }

    info!(
        completed = runs.len(),
        failures = failures.len(),
        "batch complete"
    );
    Ok(BatchOutput {
        runs,
        report: BatchReport {
            years,
            tiles,
            failures,
        },
    })
}

/// Write the product, and the encoded intermediate stages if configured
fn persist<K: StackSink + ?Sized>(run: &TileRun, config: &PipelineConfig, sink: &K) -> Result<()> {
    if config.persist_intermediate {
        // the last stage is the product itself
        for stage in &run.stages[..run.stages.len() - 1] {
            sink.write(run.gid, &config.codes.encode_stack(&stage.stack)?)?;
        }
    }
    sink.write(run.gid, &run.product)
}
