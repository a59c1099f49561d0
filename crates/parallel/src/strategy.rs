//! Parallel processing strategies

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while scheduling work
#[derive(Debug, Error)]
pub enum ParallelError {
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid thread count: {0}")]
    InvalidThreads(usize),

    #[error(transparent)]
    Core(#[from] urbano_core::Error),
}

pub type Result<T> = std::result::Result<T, ParallelError>;

/// Processing mode for tiles and spatial units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Execute a function over indices
    fn par_for_each<F>(&self, range: std::ops::Range<usize>, f: F) -> Result<()>
    where
        F: Fn(usize) + Sync + Send;

    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

impl ProcessingMode {
    fn pool(threads: usize) -> Result<rayon::ThreadPool> {
        if threads == 0 {
            return Err(ParallelError::InvalidThreads(threads));
        }
        Ok(rayon::ThreadPoolBuilder::new().num_threads(threads).build()?)
    }
}

impl ParallelStrategy for ProcessingMode {
    fn par_for_each<F>(&self, range: std::ops::Range<usize>, f: F) -> Result<()>
    where
        F: Fn(usize) + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => range.for_each(f),
            ProcessingMode::Parallel => range.into_par_iter().for_each(f),
            ProcessingMode::ParallelWith(threads) => {
                Self::pool(*threads)?.install(|| range.into_par_iter().for_each(f))
            }
        }
        Ok(())
    }

    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        Ok(match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            ProcessingMode::Parallel => range.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                Self::pool(*threads)?.install(|| range.into_par_iter().map(f).collect())
            }
        })
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}
