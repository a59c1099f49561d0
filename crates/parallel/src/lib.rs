//! # Urbano Parallel
//!
//! Parallel processing strategies for urban raster filters.
//!
//! This crate provides:
//! - Processing modes (sequential, all cores, fixed thread count)
//! - Halo-aware tiled processing with per-tile failure isolation

#[cfg(feature = "parallel")]
pub mod strategy;
#[cfg(feature = "parallel")]
pub mod tiled;

#[cfg(feature = "parallel")]
pub use strategy::{num_cpus, ParallelError, ParallelStrategy, ProcessingMode};
#[cfg(feature = "parallel")]
pub use tiled::{Tile, TileFailure, TileIterator, TiledOutput, TiledProcessor};
