//! Probability thresholding and the per-year spatial morphology filter

mod filter;
mod threshold;

pub use filter::{
    binarize, clear_nodata, filter_probability_layer, spatial_filter, Binarized, FilteredLayer,
    SpatialFilter, SpatialFilterParams,
};
pub use threshold::{
    Gid, Region, ThresholdLookup, ThresholdPeriod, ThresholdTable, TileThresholds,
    DEFAULT_THRESHOLD, DEGENERATE_THRESHOLD,
};
