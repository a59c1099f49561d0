//! Temporal filters over binary urban stacks
//!
//! Four passes, always run once each and in this order:
//! 1. [`temporal_consistency`] removes temporally isolated urban cells
//! 2. [`temporal_smoothing`] a gentler forward-looking removal pass
//! 3. [`temporal_gap_fill`] fills single-year gaps
//! 4. [`temporal_consolidation`] enforces once-urban-always-urban
//!
//! Each pass is pixel-independent and builds a new stack; a pass only
//! starts once the previous one has produced every year.

mod consistency;
mod consolidation;
mod gap_fill;
mod smoothing;
mod window;

pub use consistency::{consistency_series, consistency_window, temporal_consistency, TemporalConsistency};
pub use consolidation::{consolidation_series, temporal_consolidation, TemporalConsolidation};
pub use gap_fill::{gap_fill_series, temporal_gap_fill, GapRule, TemporalGapFill};
pub use smoothing::{smoothing_series, smoothing_window, temporal_smoothing, TemporalSmoothing};
pub use window::VoteWindow;

use serde::{Deserialize, Serialize};
use urbano_core::{RasterStack, Result};

use crate::report::StageOutput;

/// Parameters shared by the temporal filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalParams {
    /// Urban code recorded in provenance
    pub urban_code: u8,
}

impl Default for TemporalParams {
    fn default() -> Self {
        Self { urban_code: 24 }
    }
}

/// Run filters 1 to 4 in order. Returns every stage output; the last
/// one is the consolidated stack.
pub fn temporal_cascade(input: &RasterStack<u8>, params: &TemporalParams) -> Result<Vec<StageOutput>> {
    let consistency = temporal_consistency(input, params)?;
    let smoothing = temporal_smoothing(&consistency.stack, params)?;
    let gap_fill = temporal_gap_fill(&smoothing.stack, params)?;
    let consolidation = temporal_consolidation(&gap_fill.stack, params)?;
    Ok(vec![consistency, smoothing, gap_fill, consolidation])
}

/// Per-pixel equivalent of [`temporal_cascade`]
pub fn cascade_series(series: &[u8]) -> Vec<u8> {
    consolidation_series(&gap_fill_series(&smoothing_series(&consistency_series(series))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use urbano_core::{Raster, Stage};

    #[test]
    fn test_cascade_order_and_shapes() {
        let layers = (0..6)
            .map(|i| Raster::from_vec(vec![u8::from(i > 1), 0, 1, u8::from(i == 3)], 2, 2).unwrap())
            .collect();
        let stack = RasterStack::new(2000, layers).unwrap();
        let outputs = temporal_cascade(&stack, &TemporalParams::default()).unwrap();

        let stages: Vec<_> = outputs.iter().map(|o| o.report.stage).collect();
        assert_eq!(stages, Stage::CASCADE[1..5].to_vec());
        for output in &outputs {
            assert_eq!(output.stack.shape(), (2, 2));
            assert_eq!(output.stack.years(), stack.years());
        }

        let last = &outputs[3].stack;
        for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            let series = stack.pixel_series(r, c).unwrap();
            assert_eq!(last.pixel_series(r, c).unwrap(), cascade_series(&series));
        }
    }

    #[test]
    fn test_cascade_series_known_pixel() {
        // filter 1 drops the isolated fourth year; the later run survives every pass
        let series = [0, 0, 0, 1, 0, 0, 1, 1, 1, 1];
        assert_eq!(consistency_series(&series), vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(cascade_series(&series), vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
    }
}
