//! Binary mathematical morphology for urban masks
//!
//! Operations on {0,1} rasters:
//! - **Erosion**: a cell stays set only if its whole neighborhood is set
//! - **Dilation**: a cell becomes set if any neighbor is set
//! - **Opening**: erosion then dilation (removes thin protrusions)
//! - **Closing**: dilation then erosion (closes narrow gaps)
//! - **Components**: connected-component sizes, hole filling, noise removal

mod closing;
mod components;
mod dilate;
mod element;
mod erode;
mod opening;

pub use closing::{closing, Closing, ClosingParams};
pub use components::{fill_small_holes, label_components, remove_small_components, Components};
pub use dilate::{dilate, Dilate, DilateParams};
pub use element::StructuringElement;
pub use erode::{erode, Erode, ErodeParams};
pub use opening::{opening, Opening, OpeningParams};

use ndarray::Array2;
use urbano_core::raster::Raster;
use urbano_core::{Error, Result};

use crate::maybe_rayon::*;

/// Shared kernel of dilation and erosion.
///
/// For every cell, counts set cells and in-bounds cells under the
/// structuring element and lets `decide(set, in_bounds)` pick the output.
pub(crate) fn focal_binary<F>(
    raster: &Raster<u8>,
    element: &StructuringElement,
    decide: F,
) -> Result<Raster<u8>>
where
    F: Fn(usize, usize) -> bool + Sync + Send,
{
    element.validate()?;

    let (rows, cols) = raster.shape();
    let offsets = element.offsets();
    let data = raster.data();

    let output: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let mut set = 0usize;
                let mut in_bounds = 0usize;
                for &(dr, dc) in &offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    in_bounds += 1;
                    if data[(nr as usize, nc as usize)] != 0 {
                        set += 1;
                    }
                }
                *out = u8::from(decide(set, in_bounds));
            }
            row_data
        })
        .collect();

    let array =
        Array2::from_shape_vec((rows, cols), output).map_err(|e| Error::Other(e.to_string()))?;
    raster.with_data(array)
}
