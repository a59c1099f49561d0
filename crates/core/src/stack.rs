//! Year-indexed raster stacks
//!
//! A [`RasterStack`] holds one co-registered layer per year over a
//! contiguous, gap-free [`YearRange`]. Stacks are never mutated by the
//! filters that consume them: every stage builds a fresh stack.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provenance::Provenance;
use crate::raster::{Raster, RasterElement};

/// Inclusive, contiguous range of years `[first..=last]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    first: i32,
    last: i32,
}

impl YearRange {
    pub fn new(first: i32, last: i32) -> Result<Self> {
        if first > last {
            return Err(Error::InvalidYearRange { first, last });
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> i32 {
        self.first
    }

    pub fn last(&self) -> i32 {
        self.last
    }

    /// Number of years in the range
    pub fn len(&self) -> usize {
        (self.last - self.first) as usize + 1
    }

    /// Always false: a range holds at least one year
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.first..=self.last).contains(&year)
    }

    /// Position of `year` in the range, if inside
    pub fn index_of(&self, year: i32) -> Option<usize> {
        self.contains(year).then(|| (year - self.first) as usize)
    }

    /// Year at position `index` (may lie outside the range)
    pub fn year_at(&self, index: usize) -> i32 {
        self.first + index as i32
    }

    pub fn iter(&self) -> RangeInclusive<i32> {
        self.first..=self.last
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

/// A stack of co-registered rasters, one per year.
#[derive(Debug, Clone)]
pub struct RasterStack<T: RasterElement> {
    years: YearRange,
    layers: Vec<Raster<T>>,
    /// Years whose layer was zero-filled because the source had none
    substituted: BTreeSet<i32>,
    provenance: Option<Provenance>,
}

impl<T: RasterElement> RasterStack<T> {
    /// Build a stack from consecutive layers starting at `first_year`.
    ///
    /// Fails if there are no layers or if any layer is not co-registered
    /// with the first one.
    pub fn new(first_year: i32, layers: Vec<Raster<T>>) -> Result<Self> {
        let template = layers.first().ok_or(Error::EmptyStack)?;
        for (i, layer) in layers.iter().enumerate().skip(1) {
            template.ensure_coregistered(layer, &format!("stack layer {}", first_year + i as i32))?;
        }
        let years = YearRange::new(first_year, first_year + layers.len() as i32 - 1)?;
        Ok(Self {
            years,
            layers,
            substituted: BTreeSet::new(),
            provenance: None,
        })
    }

    /// Build a stack over `years` from a possibly incomplete year map.
    ///
    /// Years absent from `layers` are zero-filled on the grid of
    /// `template` and remembered as substituted. Years outside `years`
    /// are ignored.
    pub fn from_partial(
        years: YearRange,
        mut layers: BTreeMap<i32, Raster<T>>,
        template: &Raster<T>,
    ) -> Result<Self> {
        let mut ordered = Vec::with_capacity(years.len());
        let mut substituted = BTreeSet::new();
        for year in years.iter() {
            match layers.remove(&year) {
                Some(layer) => {
                    template.ensure_coregistered(&layer, &format!("stack layer {year}"))?;
                    ordered.push(layer);
                }
                None => {
                    substituted.insert(year);
                    ordered.push(template.like(T::zero()));
                }
            }
        }
        let mut stack = Self::new(years.first(), ordered)?;
        stack.substituted = substituted;
        Ok(stack)
    }

    /// Build a 1x1 stack from a single pixel's temporal vector
    pub fn from_pixel_series(first_year: i32, series: &[T]) -> Result<Self> {
        let layers = series.iter().map(|&v| Raster::filled(1, 1, v)).collect();
        Self::new(first_year, layers)
    }

    pub fn years(&self) -> YearRange {
        self.years
    }

    pub fn first_year(&self) -> i32 {
        self.years.first()
    }

    pub fn last_year(&self) -> i32 {
        self.years.last()
    }

    /// Number of layers (years)
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false: a stack holds at least one layer
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Grid dimensions shared by every layer
    pub fn shape(&self) -> (usize, usize) {
        self.layers[0].shape()
    }

    /// Layer for `year`, or `None` if the year is outside the stack
    pub fn layer(&self, year: i32) -> Option<&Raster<T>> {
        self.years.index_of(year).map(|i| &self.layers[i])
    }

    pub fn layers(&self) -> &[Raster<T>] {
        &self.layers
    }

    /// The first layer, used as the georeferencing template
    pub fn template(&self) -> &Raster<T> {
        &self.layers[0]
    }

    /// Iterate over `(year, layer)` pairs in year order
    pub fn iter(&self) -> impl Iterator<Item = (i32, &Raster<T>)> {
        self.years.iter().zip(self.layers.iter())
    }

    /// Whether the layer for `year` was zero-filled
    pub fn is_substituted(&self, year: i32) -> bool {
        self.substituted.contains(&year)
    }

    pub fn substituted_years(&self) -> impl Iterator<Item = i32> + '_ {
        self.substituted.iter().copied()
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    /// Mark years as derived from a zero-filled layer. Years outside the
    /// stack are ignored.
    pub fn with_substituted(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        let range = self.years;
        self.substituted
            .extend(years.into_iter().filter(|&y| range.contains(y)));
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Values of one pixel across all years
    pub fn pixel_series(&self, row: usize, col: usize) -> Result<Vec<T>> {
        self.layers.iter().map(|layer| layer.get(row, col)).collect()
    }

    /// Check a raster against the stack's pixel grid
    pub fn ensure_coregistered<U: RasterElement>(&self, other: &Raster<U>, context: &str) -> Result<()> {
        self.template().ensure_coregistered(other, context)
    }

    /// Build a new stack by transforming each layer independently
    pub fn map_layers<U, F>(&self, f: F) -> Result<RasterStack<U>>
    where
        U: RasterElement,
        F: Fn(i32, &Raster<T>) -> Raster<U>,
    {
        let layers = self.iter().map(|(year, layer)| f(year, layer)).collect();
        Ok(RasterStack::new(self.first_year(), layers)?.with_substituted(self.substituted_years()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    #[test]
    fn test_year_range() {
        let years = YearRange::new(1985, 2024).unwrap();
        assert_eq!(years.len(), 40);
        assert_eq!(years.index_of(1985), Some(0));
        assert_eq!(years.index_of(2024), Some(39));
        assert_eq!(years.index_of(2025), None);
        assert_eq!(years.to_string(), "1985-2024");
        assert!(YearRange::new(2000, 1999).is_err());
    }

    #[test]
    fn test_stack_rejects_misaligned_layers() {
        let a: Raster<u8> = Raster::new(4, 4);
        let b: Raster<u8> = Raster::new(4, 5);
        assert!(RasterStack::new(2000, vec![a.clone(), b]).is_err());

        let mut shifted = a.clone();
        shifted.set_transform(GeoTransform::new(10.0, 0.0, 1.0, -1.0));
        let err = RasterStack::new(2000, vec![a, shifted]).unwrap_err();
        assert!(err.is_fatal_for_stage());
    }

    #[test]
    fn test_empty_stack() {
        assert!(matches!(
            RasterStack::<u8>::new(2000, Vec::new()),
            Err(Error::EmptyStack)
        ));
    }

    #[test]
    fn test_from_partial_zero_fills_gaps() {
        let template: Raster<u8> = Raster::new(2, 2);
        let mut layers = BTreeMap::new();
        layers.insert(2000, Raster::filled(2, 2, 1u8));
        layers.insert(2002, Raster::filled(2, 2, 1u8));

        let years = YearRange::new(2000, 2002).unwrap();
        let stack = RasterStack::from_partial(years, layers, &template).unwrap();
        assert_eq!(stack.len(), 3);
        assert!(stack.is_substituted(2001));
        assert!(!stack.is_substituted(2000));
        assert_eq!(stack.layer(2001).unwrap().count_set(), 0);
        assert_eq!(stack.pixel_series(1, 1).unwrap(), vec![1, 0, 1]);
    }

    #[test]
    fn test_pixel_series_stack() {
        let stack = RasterStack::from_pixel_series(2000, &[1u8, 0, 1, 1, 0]).unwrap();
        assert_eq!(stack.first_year(), 2000);
        assert_eq!(stack.last_year(), 2004);
        assert_eq!(stack.shape(), (1, 1));
        assert_eq!(stack.layer(2003).unwrap().get(0, 0).unwrap(), 1);
    }
}
