//! Final spatial validity mask
//!
//! Zeroes every year at cells outside a static validity grid. The same
//! grid applies to all years. A grid that does not line up with the
//! stack aborts the stage.

use tracing::info;
use urbano_core::{Raster, RasterStack, Result, Stage, StageParameters};

use crate::maybe_rayon::*;
use crate::report::{finish_stage, StageOutput, YearOutcome};

/// Parameters for the validity mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityMaskParams {
    /// Grid value marking valid cells
    pub mask_value: u8,
    /// Urban code recorded in provenance
    pub urban_code: u8,
}

impl Default for ValidityMaskParams {
    fn default() -> Self {
        Self {
            mask_value: 1,
            urban_code: 24,
        }
    }
}

/// Keep `input` only where `validity` equals the mask value
pub fn apply_validity_mask(
    input: &RasterStack<u8>,
    validity: &Raster<u8>,
    params: &ValidityMaskParams,
) -> Result<StageOutput> {
    input.ensure_coregistered(validity, "validity mask")?;
    info!(stage = %Stage::FinalSpatialMask, years = %input.years(), "applying validity mask");

    let mask_value = params.mask_value;
    let rule = format!("keep where mask == {mask_value}, else 0");
    let outcomes = input
        .layers()
        .into_par_iter()
        .map(|layer| -> Result<YearOutcome> {
            let masked = layer.zip_map(validity, "validity mask", |v, m| {
                if m == mask_value {
                    v
                } else {
                    0
                }
            })?;
            Ok(YearOutcome {
                layer: masked,
                rule: rule.clone(),
                diagnostics: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    finish_stage(
        input,
        Stage::FinalSpatialMask,
        StageParameters::ValidityMask { mask_value },
        params.urban_code,
        outcomes,
    )
}
