//! # Urbano Pipeline
//!
//! Runs the urban filter cascade per GID tile and across the country:
//!
//! 1. per-year thresholding of the probability layer and the spatial
//!    morphology filter, tiled with a halo
//! 2. temporal filters 1 to 4
//! 3. the validity mask
//! 4. encoding to {0, urban code} and persistence through a [`StackSink`]
//!
//! Configuration is an immutable [`PipelineConfig`]. Raster access goes
//! through the [`ProbabilitySource`] and [`StackSink`] traits.

pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod product;
pub mod source;

pub use batch::{run_batch, BatchOutput, BatchReport, TileSummary};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{region_label, TilePipeline, TileRun, UnitFailure};
pub use product::{check_continuity, national_mosaic, ContinuityReport, Mosaic};
pub use source::{MemorySink, MemorySource, ProbabilitySource, StackSink};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::batch::{run_batch, BatchOutput, BatchReport};
    pub use crate::config::PipelineConfig;
    pub use crate::error::{PipelineError, Result};
    pub use crate::pipeline::{TilePipeline, TileRun, UnitFailure};
    pub use crate::product::{check_continuity, national_mosaic, Mosaic};
    pub use crate::source::{MemorySink, MemorySource, ProbabilitySource, StackSink};
    pub use urbano_algorithms::prelude::*;
}
