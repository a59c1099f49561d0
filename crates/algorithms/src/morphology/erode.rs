//! Binary morphological erosion (minimum filter)
//!
//! A cell stays set only when every cell of its structuring element
//! neighborhood is set. Shrinks urban regions and strips thin protrusions.

use urbano_core::raster::Raster;
use urbano_core::{Algorithm, Error, Result};

use super::element::StructuringElement;
use super::focal_binary;

/// Parameters for morphological erosion
#[derive(Debug, Clone, Default)]
pub struct ErodeParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Erosion algorithm
#[derive(Debug, Clone, Default)]
pub struct Erode;

impl Algorithm for Erode {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = ErodeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Erode"
    }

    fn description(&self) -> &'static str {
        "Binary erosion (minimum filter over structuring element)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        erode(&input, &params.element)
    }
}

/// Perform binary erosion on a {0,1} mask
///
/// Each output cell is 1 if all in-bounds cells under the structuring
/// element are non-zero. Out-of-bounds neighbors are ignored, so the
/// raster edge does not erode a region touching it.
///
/// # Arguments
/// * `raster` - Input mask (non-zero = set)
/// * `element` - Structuring element defining the neighborhood shape
pub fn erode(raster: &Raster<u8>, element: &StructuringElement) -> Result<Raster<u8>> {
    focal_binary(raster, element, |set, in_bounds| set == in_bounds)
}
