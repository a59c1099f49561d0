//! Binary morphological opening (erosion followed by dilation)
//!
//! Removes thin spurious protrusions and isolated cells while keeping
//! the footprint of compact urban regions.

use urbano_core::raster::Raster;
use urbano_core::{Algorithm, Error, Result};

use super::dilate::dilate;
use super::element::StructuringElement;
use super::erode::erode;

/// Parameters for morphological opening
#[derive(Debug, Clone, Default)]
pub struct OpeningParams {
    /// Structuring element shape
    pub element: StructuringElement,
}

/// Opening algorithm
#[derive(Debug, Clone, Default)]
pub struct Opening;

impl Algorithm for Opening {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = OpeningParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Opening"
    }

    fn description(&self) -> &'static str {
        "Binary opening (erosion then dilation) to remove thin protrusions"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        opening(&input, &params.element)
    }
}

/// Perform binary opening on a {0,1} mask
///
/// Opening = erode then dilate. Never adds a set cell.
pub fn opening(raster: &Raster<u8>, element: &StructuringElement) -> Result<Raster<u8>> {
    let eroded = erode(raster, element)?;
    dilate(&eroded, element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opening_removes_thin_line() {
        let mut raster: Raster<u8> = Raster::new(7, 9);
        for c in 1..8 {
            raster.set(3, c, 1).unwrap();
        }
        let result = opening(&raster, &StructuringElement::disk(1)).unwrap();
        assert_eq!(result.count_set(), 0);
    }

    #[test]
    fn test_opening_keeps_block_core() {
        let mut raster: Raster<u8> = Raster::new(11, 11);
        for r in 3..8 {
            for c in 3..8 {
                raster.set(r, c, 1).unwrap();
            }
        }
        // one-pixel spur sticking out of the block
        raster.set(2, 5, 1).unwrap();
        raster.set(1, 5, 1).unwrap();

        let result = opening(&raster, &StructuringElement::disk(1)).unwrap();
        assert_eq!(result.get(5, 5).unwrap(), 1);
        assert_eq!(result.get(1, 5).unwrap(), 0);
        assert!(result.count_set() <= raster.count_set());
    }
}
