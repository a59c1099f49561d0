//! Provenance records attached to stage outputs
//!
//! Provenance is for auditing only: no stage reads it to decide
//! anything.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::raster::Connectivity;
use crate::stack::YearRange;

/// Processing stage that produced a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SpatialFilter,
    TemporalConsistency,
    TemporalSmoothing,
    TemporalGapFill,
    TemporalConsolidation,
    FinalSpatialMask,
}

impl Stage {
    /// All stages of the filter cascade, in execution order
    pub const CASCADE: [Stage; 6] = [
        Stage::SpatialFilter,
        Stage::TemporalConsistency,
        Stage::TemporalSmoothing,
        Stage::TemporalGapFill,
        Stage::TemporalConsolidation,
        Stage::FinalSpatialMask,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::SpatialFilter => "spatial_filter",
            Stage::TemporalConsistency => "temporal_filter_1",
            Stage::TemporalSmoothing => "temporal_filter_2",
            Stage::TemporalGapFill => "temporal_filter_3",
            Stage::TemporalConsolidation => "temporal_filter_4",
            Stage::FinalSpatialMask => "final_spatial_mask",
        }
    }

    /// Whether the stage may turn a non-urban cell into an urban one
    pub fn can_add(&self) -> bool {
        matches!(
            self,
            Stage::SpatialFilter | Stage::TemporalGapFill | Stage::TemporalConsolidation
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Stage-specific parameters recorded for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageParameters {
    Spatial {
        radius: usize,
        hole_size: usize,
        noise_size: usize,
        connectivity: Connectivity,
    },
    /// Majority-vote window filters; the per-layer rules carry the windows
    TemporalWindow,
    GapFill,
    Consolidation { first_year_retraction: bool },
    ValidityMask { mask_value: u8 },
}

/// The rule that produced one year's layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRule {
    pub year: i32,
    pub rule: String,
}

/// Provenance of a stage output stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub stage: Stage,
    /// Tile or region label, e.g. `"GID 72 (Cuyo)"`
    pub region: String,
    pub years: YearRange,
    /// Code written for urban cells in the external encoding
    pub urban_code: u8,
    pub parameters: StageParameters,
    pub layers: Vec<LayerRule>,
}

impl Provenance {
    pub fn new(stage: Stage, years: YearRange, urban_code: u8, parameters: StageParameters) -> Self {
        Self {
            stage,
            region: String::new(),
            years,
            urban_code,
            parameters,
            layers: Vec::with_capacity(years.len()),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn push_rule(&mut self, year: i32, rule: impl Into<String>) {
        self.layers.push(LayerRule {
            year,
            rule: rule.into(),
        });
    }

    /// Rule text for `year`, if recorded
    pub fn rule_for(&self, year: i32) -> Option<&str> {
        self.layers
            .iter()
            .find(|l| l.year == year)
            .map(|l| l.rule.as_str())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
