//! Binary morphological closing (dilation followed by erosion)
//!
//! Merges nearby urban clusters and closes gaps narrower than the
//! structuring element.

use urbano_core::raster::Raster;
use urbano_core::{Algorithm, Error, Result};

use super::dilate::dilate;
use super::element::StructuringElement;
use super::erode::erode;

/// Parameters for morphological closing
#[derive(Debug, Clone, Default)]
pub struct ClosingParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Closing algorithm
#[derive(Debug, Clone, Default)]
pub struct Closing;

impl Algorithm for Closing {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = ClosingParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Closing"
    }

    fn description(&self) -> &'static str {
        "Binary closing (dilation then erosion) to close small gaps"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        closing(&input, &params.element)
    }
}

/// Perform binary closing on a {0,1} mask
///
/// Closing = dilate then erode. Never removes a set cell in the
/// interior of the raster.
pub fn closing(raster: &Raster<u8>, element: &StructuringElement) -> Result<Raster<u8>> {
    let dilated = dilate(raster, element)?;
    erode(&dilated, element)
}
