//! Raster collaborators: where probability layers come from and where
//! finished stacks go
//!
//! The pipeline only sees these traits. Layers are expected to be
//! materialized already; how a backend fetches or schedules them is its
//! own business.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::debug;
use urbano_algorithms::spatial::Gid;
use urbano_core::{Raster, RasterStack, Stage};

use crate::error::{PipelineError, Result};

/// Supplier of per-year urban probability layers and validity grids
pub trait ProbabilitySource: Sync {
    /// Urban probability (percent) of `gid` in `year`.
    ///
    /// `Ok(None)` means the layer does not exist; the year is then
    /// zero-filled and flagged downstream. `Err` marks the (year, GID)
    /// unit as failed.
    fn probability(&self, gid: Gid, year: i32) -> Result<Option<Raster<u8>>>;

    /// Static validity grid of `gid`, co-registered with its layers
    fn validity_mask(&self, gid: Gid) -> Result<Raster<u8>>;
}

/// Receiver of stage output stacks
pub trait StackSink: Sync {
    /// Persist a stack; its provenance names the stage that produced it
    fn write(&self, gid: Gid, stack: &RasterStack<u8>) -> Result<()>;
}

/// Source backed by maps of in-memory rasters
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    layers: BTreeMap<(Gid, i32), Raster<u8>>,
    masks: BTreeMap<Gid, Raster<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_layer(&mut self, gid: Gid, year: i32, probability: Raster<u8>) {
        self.layers.insert((gid, year), probability);
    }

    pub fn insert_mask(&mut self, gid: Gid, mask: Raster<u8>) {
        self.masks.insert(gid, mask);
    }

    pub fn with_layer(mut self, gid: Gid, year: i32, probability: Raster<u8>) -> Self {
        self.insert_layer(gid, year, probability);
        self
    }

    pub fn with_mask(mut self, gid: Gid, mask: Raster<u8>) -> Self {
        self.insert_mask(gid, mask);
        self
    }
}

impl ProbabilitySource for MemorySource {
    fn probability(&self, gid: Gid, year: i32) -> Result<Option<Raster<u8>>> {
        Ok(self.layers.get(&(gid, year)).cloned())
    }

    fn validity_mask(&self, gid: Gid) -> Result<Raster<u8>> {
        self.masks.get(&gid).cloned().ok_or_else(|| PipelineError::Source {
            gid,
            reason: "no validity mask".into(),
        })
    }
}

/// Sink keeping the last stack written per (GID, stage)
#[derive(Debug, Default)]
pub struct MemorySink {
    stacks: Mutex<BTreeMap<(Gid, Stage), RasterStack<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, gid: Gid, stage: Stage) -> Option<RasterStack<u8>> {
        self.stacks.lock().ok()?.get(&(gid, stage)).cloned()
    }

    pub fn len(&self) -> usize {
        self.stacks.lock().map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// GIDs with at least one stored stack
    pub fn gids(&self) -> Vec<Gid> {
        let Ok(stacks) = self.stacks.lock() else {
            return Vec::new();
        };
        let mut gids: Vec<Gid> = stacks.keys().map(|&(gid, _)| gid).collect();
        gids.dedup();
        gids
    }
}

impl StackSink for MemorySink {
    fn write(&self, gid: Gid, stack: &RasterStack<u8>) -> Result<()> {
        let stage = stack
            .provenance()
            .map(|p| p.stage)
            .ok_or_else(|| PipelineError::Sink {
                gid,
                reason: "stack carries no provenance".into(),
            })?;
        let mut stacks = self.stacks.lock().map_err(|_| PipelineError::Sink {
            gid,
            reason: "sink lock poisoned".into(),
        })?;
        debug!(gid, stage = %stage, years = %stack.years(), "stored stack");
        stacks.insert((gid, stage), stack.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urbano_core::{Provenance, StageParameters};

    #[test]
    fn test_memory_source_lookup() {
        let source = MemorySource::new()
            .with_layer(72, 2000, Raster::filled(2, 2, 80))
            .with_mask(72, Raster::filled(2, 2, 1));

        assert!(source.probability(72, 2000).unwrap().is_some());
        assert!(source.probability(72, 2001).unwrap().is_none());
        assert!(source.validity_mask(72).is_ok());
        assert!(matches!(
            source.validity_mask(77),
            Err(PipelineError::Source { gid: 77, .. })
        ));
    }

    #[test]
    fn test_sink_keys_by_stage() {
        let sink = MemorySink::new();
        let stack = RasterStack::new(2000, vec![Raster::filled(1, 1, 24u8)]).unwrap();
        assert!(sink.write(72, &stack).is_err());

        let provenance = Provenance::new(
            Stage::FinalSpatialMask,
            stack.years(),
            24,
            StageParameters::ValidityMask { mask_value: 1 },
        );
        sink.write(72, &stack.with_provenance(provenance)).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.gids(), vec![72]);
        assert!(sink.get(72, Stage::FinalSpatialMask).is_some());
        assert!(sink.get(72, Stage::SpatialFilter).is_none());
    }
}
