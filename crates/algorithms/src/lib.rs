//! # Urbano Algorithms
//!
//! Filters that turn annual urban probability layers into a consistent
//! binary urban time series.
//!
//! ## Available Algorithm Categories
//!
//! - **morphology**: Dilation, erosion, opening, closing, connected components
//! - **spatial**: Per-tile thresholds, binarization, the spatial morphology filter
//! - **temporal**: Consistency, smoothing, gap fill and consolidation passes
//! - **mask**: Final spatial validity mask
//! - **codes**: {0,1} <-> {0, urban code} encoding
//! - **report**: Per-stage statistics and data-quality diagnostics

pub mod codes;
pub mod mask;
pub(crate) mod maybe_rayon;
pub mod morphology;
pub mod report;
pub mod spatial;
pub mod temporal;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::codes::ClassCodes;
    pub use crate::mask::{apply_validity_mask, ValidityMaskParams};
    pub use crate::morphology::{
        closing, dilate, erode, opening, Closing, Dilate, Erode, Opening, StructuringElement,
    };
    pub use crate::report::{Diagnostic, StageOutput, StageReport, YearStats};
    pub use crate::spatial::{
        binarize, filter_probability_layer, spatial_filter, Gid, Region, SpatialFilter,
        SpatialFilterParams, ThresholdTable,
    };
    pub use crate::temporal::{
        temporal_cascade, temporal_consistency, temporal_consolidation, temporal_gap_fill,
        temporal_smoothing, TemporalConsistency, TemporalConsolidation, TemporalGapFill,
        TemporalParams, TemporalSmoothing,
    };
    pub use urbano_core::prelude::*;
}
