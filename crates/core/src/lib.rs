//! # Urbano Core
//!
//! Core types for per-pixel urban land-cover time series.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `RasterStack<T>`: Contiguous year-indexed stack of co-registered rasters
//! - `Provenance`: Typed audit record attached to every stage output
//! - Algorithm trait for a consistent stage API

pub mod error;
pub mod provenance;
pub mod raster;
pub mod stack;

pub use error::{Error, Result};
pub use provenance::{LayerRule, Provenance, Stage, StageParameters};
pub use raster::{Connectivity, GeoTransform, Raster, RasterElement};
pub use stack::{RasterStack, YearRange};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::provenance::{Provenance, Stage, StageParameters};
    pub use crate::raster::{Connectivity, GeoTransform, Raster, RasterElement};
    pub use crate::stack::{RasterStack, YearRange};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in urbano.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
