//! Per-tile probability thresholds
//!
//! Each GID carries its own thresholds for a handful of year periods.
//! Lookups never fail: a missing entry or a threshold high enough to
//! exclude nearly every pixel falls back to the default and comes with a
//! [`Diagnostic`] for the stage report.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use urbano_core::{Error, Result};

use crate::report::Diagnostic;

/// Tile (chart) identifier
pub type Gid = u32;

/// Threshold used when none is configured or the configured one is degenerate
pub const DEFAULT_THRESHOLD: u8 = 50;

/// Thresholds at or above this value are treated as degenerate
pub const DEGENERATE_THRESHOLD: u8 = 95;

/// Geographic region a tile belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Patagonia,
    Cuyo,
    Chaco,
    Pampa,
    PampaChaco,
    CuyoChaco,
    AtlanticForest,
    #[default]
    Unknown,
}

impl Region {
    pub fn label(&self) -> &'static str {
        match self {
            Region::Patagonia => "Patagonia",
            Region::Cuyo => "Cuyo",
            Region::Chaco => "Chaco",
            Region::Pampa => "Pampa",
            Region::PampaChaco => "Pampa/Chaco",
            Region::CuyoChaco => "Cuyo/Chaco",
            Region::AtlanticForest => "Bosque Atlantico",
            Region::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A threshold valid for the years `[first_year..=last_year]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdPeriod {
    pub first_year: i32,
    pub last_year: i32,
    /// Minimum probability (percent) for a pixel to count as urban
    pub threshold: u8,
}

impl ThresholdPeriod {
    pub fn contains(&self, year: i32) -> bool {
        (self.first_year..=self.last_year).contains(&year)
    }
}

/// Thresholds and region of one tile
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TileThresholds {
    #[serde(default)]
    pub region: Region,
    pub periods: Vec<ThresholdPeriod>,
}

/// Result of a threshold lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdLookup {
    pub threshold: u8,
    /// Set when the fallback policy kicked in
    pub diagnostic: Option<Diagnostic>,
}

/// Read-only GID x period threshold table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdTable {
    tiles: BTreeMap<Gid, TileThresholds>,
    #[serde(default = "default_threshold")]
    default_threshold: u8,
    #[serde(default = "degenerate_threshold")]
    degenerate_threshold: u8,
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

fn degenerate_threshold() -> u8 {
    DEGENERATE_THRESHOLD
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            tiles: BTreeMap::new(),
            default_threshold: DEFAULT_THRESHOLD,
            degenerate_threshold: DEGENERATE_THRESHOLD,
        }
    }
}

/// Periods shared by the national table
const PERIODS: [(i32, i32); 3] = [(1985, 2004), (2005, 2019), (2020, 2024)];

impl ThresholdTable {
    pub fn new(default_threshold: u8, degenerate_threshold: u8) -> Self {
        Self {
            tiles: BTreeMap::new(),
            default_threshold,
            degenerate_threshold,
        }
    }

    /// The national table: 28 tiles over 1985-2004, 2005-2019 and 2020-2024
    pub fn argentina() -> Self {
        use Region::*;
        #[rustfmt::skip]
        let rows: [(Gid, Region, [u8; 3]); 28] = [
            (13, Patagonia, [58, 50, 48]),
            (39, Patagonia, [46, 49, 52]),
            (43, Patagonia, [57, 57, 58]),
            (50, Patagonia, [65, 55, 55]),
            (54, Patagonia, [49, 49, 55]),
            (107, Patagonia, [60, 60, 54]),
            (110, Patagonia, [55, 49, 55]),
            (143, Patagonia, [58, 58, 60]),
            (147, Patagonia, [55, 45, 57]),
            (195, Patagonia, [15, 80, 80]),
            (229, Patagonia, [40, 61, 67]),
            (72, Cuyo, [50, 50, 51]),
            (77, Cuyo, [60, 60, 66]),
            (83, Cuyo, [60, 60, 48]),
            (88, Cuyo, [60, 60, 66]),
            (121, Chaco, [53, 53, 53]),
            (128, Chaco, [45, 46, 54]),
            (149, Chaco, [53, 47, 48]),
            (180, Chaco, [54, 43, 51]),
            (182, Chaco, [51, 50, 60]),
            (133, Pampa, [50, 57, 54]),
            (171, Pampa, [54, 60, 58]),
            (187, Pampa, [47, 53, 55]),
            (247, Pampa, [42, 50, 67]),
            (248, Pampa, [46, 47, 52]),
            (140, PampaChaco, [47, 49, 56]),
            (232, CuyoChaco, [49, 50, 52]),
            (196, AtlanticForest, [46, 56, 52]),
        ];

        let mut table = Self::default();
        for (gid, region, thresholds) in rows {
            let periods = PERIODS
                .iter()
                .zip(thresholds)
                .map(|(&(first_year, last_year), threshold)| ThresholdPeriod {
                    first_year,
                    last_year,
                    threshold,
                })
                .collect();
            table.insert(gid, TileThresholds { region, periods });
        }
        table
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Thresholds are percentages; periods must not be inverted
    pub fn validate(&self) -> Result<()> {
        if self.default_threshold > 100 || self.default_threshold >= self.degenerate_threshold {
            return Err(Error::InvalidParameter {
                name: "default_threshold",
                value: self.default_threshold.to_string(),
                reason: "must be at most 100 and below the degenerate threshold".into(),
            });
        }
        for (gid, tile) in &self.tiles {
            for period in &tile.periods {
                if period.first_year > period.last_year || period.threshold > 100 {
                    return Err(Error::InvalidParameter {
                        name: "periods",
                        value: format!(
                            "GID {gid}: {}-{} -> {}",
                            period.first_year, period.last_year, period.threshold
                        ),
                        reason: "period years inverted or threshold above 100".into(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Replace the fallback thresholds, keeping the tiles
    pub fn with_fallback(mut self, default_threshold: u8, degenerate_threshold: u8) -> Self {
        self.default_threshold = default_threshold;
        self.degenerate_threshold = degenerate_threshold;
        self
    }

    pub fn insert(&mut self, gid: Gid, tile: TileThresholds) {
        self.tiles.insert(gid, tile);
    }

    pub fn default_threshold(&self) -> u8 {
        self.default_threshold
    }

    pub fn degenerate_threshold(&self) -> u8 {
        self.degenerate_threshold
    }

    pub fn contains(&self, gid: Gid) -> bool {
        self.tiles.contains_key(&gid)
    }

    pub fn region(&self, gid: Gid) -> Region {
        self.tiles.get(&gid).map_or(Region::Unknown, |t| t.region)
    }

    /// Tiles to process, in ascending GID order
    pub fn gids(&self, include_patagonia: bool) -> Vec<Gid> {
        self.tiles
            .iter()
            .filter(|(_, tile)| include_patagonia || tile.region != Region::Patagonia)
            .map(|(&gid, _)| gid)
            .collect()
    }

    /// Threshold for `gid` in `year`, applying the fallback policy
    pub fn lookup(&self, gid: Gid, year: i32) -> ThresholdLookup {
        let configured = self
            .tiles
            .get(&gid)
            .and_then(|tile| tile.periods.iter().find(|p| p.contains(year)))
            .map(|p| p.threshold);

        match configured {
            None => ThresholdLookup {
                threshold: self.default_threshold,
                diagnostic: Some(Diagnostic::MissingThreshold {
                    gid,
                    year,
                    fallback: self.default_threshold,
                }),
            },
            Some(t) if t >= self.degenerate_threshold => ThresholdLookup {
                threshold: self.default_threshold,
                diagnostic: Some(Diagnostic::DegenerateThreshold {
                    gid,
                    year,
                    configured: t,
                    fallback: self.default_threshold,
                }),
            },
            Some(threshold) => ThresholdLookup {
                threshold,
                diagnostic: None,
            },
        }
    }
}
