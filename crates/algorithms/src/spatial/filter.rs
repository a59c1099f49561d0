//! Spatial morphology filter for one year's urban mask
//!
//! Fixed order: closing, small-hole filling, opening, small-component
//! removal. Cells that were no-data in the probability layer come out
//! as not urban whatever morphology decided.

use serde::{Deserialize, Serialize};
use tracing::debug;
use urbano_core::raster::{Connectivity, Raster, RasterElement};
use urbano_core::{Algorithm, Error, Result, StageParameters};

use crate::morphology::{closing, fill_small_holes, opening, remove_small_components, StructuringElement};
use crate::report::YearStats;

/// Parameters for the spatial morphology filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialFilterParams {
    /// Radius of the disk structuring element
    pub radius: usize,
    /// Enclosed non-urban components smaller than this are filled
    pub hole_size: usize,
    /// Urban components of at most this many pixels are removed
    pub noise_size: usize,
    pub connectivity: Connectivity,
}

impl Default for SpatialFilterParams {
    fn default() -> Self {
        Self {
            radius: 1,
            hole_size: 60,
            noise_size: 5,
            connectivity: Connectivity::Eight,
        }
    }
}

impl SpatialFilterParams {
    pub fn element(&self) -> StructuringElement {
        StructuringElement::disk(self.radius)
    }

    /// Overlap a tile needs for its interior to match a whole-raster run.
    ///
    /// Closing and opening each reach `2 * radius`. A component counted in
    /// the hole or noise step is only known to be small if it fits
    /// entirely in the halo, so those sizes add to the reach.
    pub fn halo(&self) -> usize {
        4 * self.radius + self.hole_size + self.noise_size + 1
    }

    pub fn validate(&self) -> Result<()> {
        if self.radius == 0 {
            return Err(Error::InvalidParameter {
                name: "radius",
                value: "0".into(),
                reason: "structuring element radius must be at least 1".into(),
            });
        }
        if self.hole_size == 0 {
            return Err(Error::InvalidParameter {
                name: "hole_size",
                value: "0".into(),
                reason: "hole size must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn provenance(&self) -> StageParameters {
        StageParameters::Spatial {
            radius: self.radius,
            hole_size: self.hole_size,
            noise_size: self.noise_size,
            connectivity: self.connectivity,
        }
    }

    /// Rule text recorded for each filtered layer
    pub fn describe(&self, threshold: u8) -> String {
        format!(
            "prob >= {threshold}; closing r={r}; fill holes < {h}; opening r={r}; drop components <= {n}",
            r = self.radius,
            h = self.hole_size,
            n = self.noise_size,
        )
    }
}

/// A thresholded probability layer
#[derive(Debug, Clone)]
pub struct Binarized {
    /// 1 where the probability reaches the threshold
    pub mask: Raster<u8>,
    /// 1 where the probability layer had no data
    pub nodata: Raster<u8>,
}

/// Threshold a probability layer (percent) into an urban mask.
///
/// No-data cells are never urban and are tracked in a separate mask.
pub fn binarize<T: RasterElement>(probability: &Raster<T>, threshold: u8) -> Binarized {
    let nodata_value = probability.nodata();
    let threshold = f64::from(threshold);
    let mask = probability.map(move |v| {
        u8::from(!v.is_nodata(nodata_value) && v.to_f64().is_some_and(|p| p >= threshold))
    });
    let nodata = probability.map(move |v| u8::from(v.is_nodata(nodata_value)));
    Binarized { mask, nodata }
}

/// Run the four morphology steps on a binary mask
pub fn spatial_filter(mask: &Raster<u8>, params: &SpatialFilterParams) -> Result<Raster<u8>> {
    params.validate()?;
    let element = params.element();

    let closed = closing(mask, &element)?;
    let filled = fill_small_holes(&closed, params.hole_size, params.connectivity)?;
    let opened = opening(&filled, &element)?;
    remove_small_components(&opened, params.noise_size, params.connectivity)
}

/// Force no-data cells to not urban
pub fn clear_nodata(filtered: &Raster<u8>, nodata: &Raster<u8>) -> Result<Raster<u8>> {
    filtered.zip_map(nodata, "no-data mask", |v, nd| u8::from(v != 0 && nd == 0))
}

/// One filtered year
#[derive(Debug, Clone)]
pub struct FilteredLayer {
    /// Binary urban mask after filtering
    pub urban: Raster<u8>,
    /// Thresholded input against filtered output
    pub stats: YearStats,
}

/// Threshold, filter and clean one year's probability layer
pub fn filter_probability_layer<T: RasterElement>(
    year: i32,
    probability: &Raster<T>,
    threshold: u8,
    params: &SpatialFilterParams,
) -> Result<FilteredLayer> {
    let binarized = binarize(probability, threshold);
    let filtered = spatial_filter(&binarized.mask, params)?;
    let urban = clear_nodata(&filtered, &binarized.nodata)?;
    let stats = YearStats::compare(year, &binarized.mask, &urban);
    debug!(
        year,
        threshold,
        before = stats.urban_before,
        after = stats.urban_after,
        "spatial filter"
    );
    Ok(FilteredLayer { urban, stats })
}

/// Spatial morphology filter algorithm
#[derive(Debug, Clone, Default)]
pub struct SpatialFilter;

impl Algorithm for SpatialFilter {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = SpatialFilterParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SpatialFilter"
    }

    fn description(&self) -> &'static str {
        "Closing, small-hole filling, opening and small-component removal on a binary mask"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        spatial_filter(&input, &params)
    }
}
