//! Binary morphological dilation (maximum filter)
//!
//! A cell becomes set when any cell of its structuring element
//! neighborhood is set. Grows urban regions and closes narrow gaps.

use urbano_core::raster::Raster;
use urbano_core::{Algorithm, Error, Result};

use super::element::StructuringElement;
use super::focal_binary;

/// Parameters for morphological dilation
#[derive(Debug, Clone, Default)]
pub struct DilateParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Dilation algorithm
#[derive(Debug, Clone, Default)]
pub struct Dilate;

impl Algorithm for Dilate {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = DilateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Dilate"
    }

    fn description(&self) -> &'static str {
        "Binary dilation (maximum filter over structuring element)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dilate(&input, &params.element)
    }
}

/// Perform binary dilation on a {0,1} mask
///
/// Each output cell is 1 if any in-bounds cell under the structuring
/// element is non-zero. Neighbors beyond the raster edge are ignored,
/// so the border is treated like any other cell.
///
/// # Arguments
/// * `raster` - Input mask (non-zero = set)
/// * `element` - Structuring element defining the neighborhood shape
pub fn dilate(raster: &Raster<u8>, element: &StructuringElement) -> Result<Raster<u8>> {
    focal_binary(raster, element, |set, _in_bounds| set > 0)
}
