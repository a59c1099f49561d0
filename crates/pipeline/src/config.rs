//! Immutable run configuration
//!
//! One `PipelineConfig` is built (or loaded from JSON) before a run and
//! handed by reference to every stage. Nothing reads configuration from
//! global state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use urbano_algorithms::codes::ClassCodes;
use urbano_algorithms::mask::ValidityMaskParams;
use urbano_algorithms::spatial::{SpatialFilterParams, ThresholdTable, DEFAULT_THRESHOLD, DEGENERATE_THRESHOLD};
use urbano_algorithms::temporal::TemporalParams;
use urbano_core::YearRange;
use urbano_parallel::ProcessingMode;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub start_year: i32,
    pub end_year: i32,
    /// Process the Patagonian tiles too
    pub include_patagonia: bool,
    pub spatial: SpatialFilterParams,
    pub codes: ClassCodes,
    /// Validity grid value marking cells that may hold a result
    pub mask_value: u8,
    pub default_threshold: u8,
    pub degenerate_threshold: u8,
    /// Core block size for tiled morphology, in pixels
    pub tile_size: usize,
    pub mode: ProcessingMode,
    /// Also hand every intermediate stage to the sink
    pub persist_intermediate: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_year: 1985,
            end_year: 2024,
            include_patagonia: false,
            spatial: SpatialFilterParams::default(),
            codes: ClassCodes::default(),
            mask_value: 1,
            default_threshold: DEFAULT_THRESHOLD,
            degenerate_threshold: DEGENERATE_THRESHOLD,
            tile_size: 512,
            mode: ProcessingMode::default(),
            persist_intermediate: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.years()?;
        self.spatial.validate()?;
        self.codes.validate()?;
        if self.tile_size == 0 {
            return Err(PipelineError::Config("tile_size must be positive".into()));
        }
        if self.default_threshold > 100 {
            return Err(PipelineError::Config(format!(
                "default_threshold {} is not a percentage",
                self.default_threshold
            )));
        }
        if self.default_threshold >= self.degenerate_threshold {
            return Err(PipelineError::Config(format!(
                "default_threshold {} must be below degenerate_threshold {}",
                self.default_threshold, self.degenerate_threshold
            )));
        }
        Ok(())
    }

    pub fn years(&self) -> Result<YearRange> {
        YearRange::new(self.start_year, self.end_year)
            .map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Mode for work nested inside a unit that `mode` already scheduled.
    ///
    /// Nested rayon work runs on the pool of the enclosing unit.
    pub fn nested_mode(&self) -> ProcessingMode {
        match self.mode {
            ProcessingMode::Sequential => ProcessingMode::Sequential,
            _ => ProcessingMode::Parallel,
        }
    }

    /// The national threshold table with this run's fallback thresholds
    pub fn thresholds(&self) -> ThresholdTable {
        ThresholdTable::argentina().with_fallback(self.default_threshold, self.degenerate_threshold)
    }

    pub fn temporal(&self) -> TemporalParams {
        TemporalParams {
            urban_code: self.codes.urban,
        }
    }

    pub fn validity(&self) -> ValidityMaskParams {
        ValidityMaskParams {
            mask_value: self.mask_value,
            urban_code: self.codes.urban,
        }
    }
}
