//! Checks and merges over finished tile products

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use urbano_algorithms::spatial::Gid;
use urbano_core::{Error, Raster, RasterStack, YearRange};

use crate::error::Result;

/// Years of the configured range without real data in a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityReport {
    pub expected: YearRange,
    /// Absent from the stack or zero-filled
    pub missing: Vec<i32>,
}

impl ContinuityReport {
    pub fn is_continuous(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Verify that every year of `expected` is present in `stack`
pub fn check_continuity(stack: &RasterStack<u8>, expected: YearRange) -> ContinuityReport {
    let missing: Vec<i32> = expected
        .iter()
        .filter(|&year| !stack.years().contains(year) || stack.is_substituted(year))
        .collect();
    if !missing.is_empty() {
        warn!(expected = %expected, missing = ?missing, "stack has gaps");
    }
    ContinuityReport { expected, missing }
}

/// One year merged across tiles
#[derive(Debug, Clone)]
pub struct Mosaic {
    pub year: i32,
    /// Cell-wise maximum of the contributing tiles
    pub raster: Raster<u8>,
    pub contributed: Vec<Gid>,
    /// Tiles whose product does not cover this year
    pub failed: Vec<Gid>,
}

/// Merge one year of every tile into a single grid.
///
/// Tiles share one pixel grid; any tile marking a cell urban wins. Every
/// product layer counts, including years the temporal filters rebuilt
/// from a gap in the source; those gaps belong in [`ContinuityReport`].
/// A tile whose product does not cover `year` is listed as failed. Fails
/// when no tile contributes or when a tile is not co-registered with the
/// first.
pub fn national_mosaic<'a, I>(year: i32, tiles: I) -> Result<Mosaic>
where
    I: IntoIterator<Item = (Gid, &'a RasterStack<u8>)>,
{
    let mut merged: Option<Raster<u8>> = None;
    let mut contributed = Vec::new();
    let mut failed = Vec::new();

    for (gid, stack) in tiles {
        let layer = match stack.layer(year) {
            Some(layer) => layer,
            None => {
                failed.push(gid);
                continue;
            }
        };
        merged = Some(match merged {
            None => layer.clone(),
            Some(acc) => acc.zip_map(layer, &format!("mosaic tile {gid}"), |a, b| a.max(b))?,
        });
        contributed.push(gid);
    }

    let raster = merged.ok_or(Error::EmptyStack)?;
    debug!(year, contributed = contributed.len(), failed = failed.len(), "mosaic");
    Ok(Mosaic {
        year,
        raster,
        contributed,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::collections::BTreeMap;

    #[test]
    fn test_continuity_flags_substituted_years() {
        let years = YearRange::new(2000, 2003).unwrap();
        let mut layers = BTreeMap::new();
        layers.insert(2000, Raster::filled(2, 2, 1u8));
        layers.insert(2003, Raster::filled(2, 2, 1u8));
        let stack = RasterStack::from_partial(years, layers, &Raster::new(2, 2)).unwrap();

        let report = check_continuity(&stack, years);
        assert_eq!(report.missing, vec![2001, 2002]);
        assert!(!report.is_continuous());
    }

    #[test]
    fn test_continuity_outside_stack_range() {
        let stack = RasterStack::new(2001, vec![Raster::filled(1, 1, 1u8); 2]).unwrap();
        let report = check_continuity(&stack, YearRange::new(2000, 2002).unwrap());
        assert_eq!(report.missing, vec![2000]);
    }

    #[test]
    fn test_mosaic_any_urban_wins() {
        let a = RasterStack::new(2000, vec![Raster::from_vec(vec![24u8, 0, 0, 0], 2, 2).unwrap()]).unwrap();
        let b = RasterStack::new(2000, vec![Raster::from_vec(vec![0u8, 0, 0, 24], 2, 2).unwrap()]).unwrap();
        let c = RasterStack::new(2001, vec![Raster::filled(2, 2, 24u8)]).unwrap();

        let mosaic = national_mosaic(2000, [(72, &a), (77, &b), (83, &c)]).unwrap();
        assert_eq!(mosaic.raster.data().iter().copied().collect::<Vec<_>>(), vec![24, 0, 0, 24]);
        assert_eq!(mosaic.contributed, vec![72, 77]);
        assert_eq!(mosaic.failed, vec![83]);
    }

    #[test]
    fn test_mosaic_keeps_rebuilt_source_gaps() {
        let years = YearRange::new(2000, 2002).unwrap();
        let mut layers = BTreeMap::new();
        layers.insert(2000, Raster::filled(2, 2, 24u8));
        layers.insert(2002, Raster::filled(2, 2, 24u8));
        let gap = RasterStack::from_partial(years, layers, &Raster::new(2, 2)).unwrap();
        // a filtered product keeps the flag but carries real values
        let filled = gap.map_layers(|_, _| Raster::filled(2, 2, 24u8)).unwrap();
        assert!(filled.is_substituted(2001));

        let mosaic = national_mosaic(2001, [(72, &filled)]).unwrap();
        assert_eq!(mosaic.contributed, vec![72]);
        assert!(mosaic.failed.is_empty());
        assert_eq!(mosaic.raster.get(1, 1).unwrap(), 24);
        assert_eq!(check_continuity(&filled, years).missing, vec![2001]);
    }

    #[test]
    fn test_mosaic_without_tiles_fails() {
        let stacks: Vec<(Gid, &RasterStack<u8>)> = Vec::new();
        let err = national_mosaic(2000, stacks).unwrap_err();
        assert!(matches!(err, PipelineError::Core(Error::EmptyStack)));
    }

    #[test]
    fn test_mosaic_rejects_misaligned_tiles() {
        let a = RasterStack::new(2000, vec![Raster::filled(2, 2, 24u8)]).unwrap();
        let b = RasterStack::new(2000, vec![Raster::filled(3, 2, 24u8)]).unwrap();
        assert!(national_mosaic(2000, [(72, &a), (77, &b)]).is_err());
    }
}
