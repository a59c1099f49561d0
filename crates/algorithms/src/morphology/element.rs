//! Disk structuring element for the morphological operations
//!
//! The urban filter closes and opens with a circular kernel: every cell
//! within Euclidean distance `radius` of the center is active.

use serde::{Deserialize, Serialize};
use urbano_core::{Error, Result};

/// Disk of the given radius in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuringElement {
    radius: usize,
}

impl Default for StructuringElement {
    /// Radius-1 disk, the kernel used by the urban spatial filter
    fn default() -> Self {
        Self::disk(1)
    }
}

impl StructuringElement {
    pub const fn disk(radius: usize) -> Self {
        Self { radius }
    }

    /// Validate the structuring element, returning an error for invalid configurations
    pub fn validate(&self) -> Result<()> {
        if self.radius == 0 {
            return Err(Error::InvalidParameter {
                name: "radius",
                value: "0".to_string(),
                reason: "structuring element radius must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// (dr, dc) offsets of the active cells, center included
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius as isize;
        (-r..=r)
            .flat_map(|dr| (-r..=r).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| dr * dr + dc * dc <= r * r)
            .collect()
    }
}
