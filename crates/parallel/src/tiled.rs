//! Tiled processing for large rasters
//!
//! A raster is cut into square core blocks. Each tile hands its core plus
//! a halo of surrounding cells to the kernel, and only the core of the
//! result is written back, so neighbourhood operations see the same
//! context they would on the whole raster. A tile whose kernel fails
//! leaves its core at zero and is reported; other tiles are unaffected.

use ndarray::s;
use tracing::{debug, warn};
use urbano_core::raster::{Raster, RasterElement};
use urbano_core::{Error, Result as CoreResult};

use crate::strategy::{ParallelStrategy, ProcessingMode, Result};

/// A core block of the raster together with its halo window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Position in iteration order
    pub index: usize,
    /// Core block owned by this tile
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
    /// Core plus halo, clamped to the raster
    pub window_row: usize,
    pub window_col: usize,
    pub window_rows: usize,
    pub window_cols: usize,
}

impl Tile {
    /// Offset of the core block inside the window
    pub fn core_offset(&self) -> (usize, usize) {
        (self.row - self.window_row, self.col - self.window_col)
    }
}

/// Iterator over tiles covering a raster, row by row
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    halo: usize,
    current_row: usize,
    current_col: usize,
    index: usize,
}

impl TileIterator {
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize, halo: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            halo,
            current_row: 0,
            current_col: 0,
            index: 0,
        }
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let row = self.current_row;
        let col = self.current_col;
        let rows = self.tile_size.min(self.total_rows - row);
        let cols = self.tile_size.min(self.total_cols - col);

        let window_row = row.saturating_sub(self.halo);
        let window_col = col.saturating_sub(self.halo);
        let window_end_row = (row + rows + self.halo).min(self.total_rows);
        let window_end_col = (col + cols + self.halo).min(self.total_cols);

        let tile = Tile {
            index: self.index,
            row,
            col,
            rows,
            cols,
            window_row,
            window_col,
            window_rows: window_end_row - window_row,
            window_cols: window_end_col - window_col,
        };

        self.index += 1;
        self.current_col += self.tile_size;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_size;
        }

        Some(tile)
    }
}

/// A tile whose kernel failed
#[derive(Debug)]
pub struct TileFailure {
    pub tile: Tile,
    pub error: Error,
}

/// Result of a tiled run
#[derive(Debug)]
pub struct TiledOutput<U: RasterElement> {
    /// Merged cores; cores of failed tiles are zero
    pub raster: Raster<U>,
    pub failures: Vec<TileFailure>,
}

impl<U: RasterElement> TiledOutput<U> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Processor for tiled raster operations
#[derive(Debug, Clone, Copy)]
pub struct TiledProcessor {
    tile_size: usize,
    halo: usize,
    mode: ProcessingMode,
}

impl TiledProcessor {
    pub fn new(tile_size: usize, halo: usize) -> Self {
        Self {
            tile_size,
            halo,
            mode: ProcessingMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn halo(&self) -> usize {
        self.halo
    }

    pub fn tiles(&self, rows: usize, cols: usize) -> Vec<Tile> {
        TileIterator::new(rows, cols, self.tile_size, self.halo).collect()
    }

    /// Run `f` on every tile window and merge the cores.
    ///
    /// `f` must return a raster with the shape of the window it was given.
    pub fn process<T, U, F>(&self, input: &Raster<T>, f: F) -> Result<TiledOutput<U>>
    where
        T: RasterElement,
        U: RasterElement,
        F: Fn(&Raster<T>) -> CoreResult<Raster<U>> + Sync + Send,
    {
        let (rows, cols) = input.shape();
        let tiles = self.tiles(rows, cols);
        debug!(tiles = tiles.len(), tile_size = self.tile_size, halo = self.halo, "tiled run");

        let results = self.mode.par_map(0..tiles.len(), |i| -> CoreResult<Raster<U>> {
            let tile = tiles[i];
            let window = input.window(tile.window_row, tile.window_col, tile.window_rows, tile.window_cols)?;
            let result = f(&window)?;
            window.ensure_coregistered(&result, "tile result")?;
            Ok(result)
        })?;

        let mut output = input.with_same_meta::<U>();
        let mut failures = Vec::new();
        for (tile, result) in tiles.into_iter().zip(results) {
            match result {
                Ok(result) => {
                    let (r0, c0) = tile.core_offset();
                    output
                        .data_mut()
                        .slice_mut(s![tile.row..tile.row + tile.rows, tile.col..tile.col + tile.cols])
                        .assign(&result.data().slice(s![r0..r0 + tile.rows, c0..c0 + tile.cols]));
                }
                Err(error) => {
                    warn!(tile = tile.index, row = tile.row, col = tile.col, %error, "tile failed");
                    failures.push(TileFailure { tile, error });
                }
            }
        }

        Ok(TiledOutput {
            raster: output,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_iterator() {
        let tiles: Vec<_> = TileIterator::new(100, 100, 32, 1).collect();
        assert_eq!(tiles.len(), 16);

        assert_eq!((tiles[0].row, tiles[0].col), (0, 0));
        assert_eq!((tiles[0].window_row, tiles[0].window_col), (0, 0));
        assert_eq!(tiles[0].window_rows, 33);

        let inner = tiles[5];
        assert_eq!((inner.row, inner.col), (32, 32));
        assert_eq!((inner.window_row, inner.window_col), (31, 31));
        assert_eq!(inner.core_offset(), (1, 1));

        let last = tiles[15];
        assert_eq!((last.rows, last.cols), (4, 4));
        assert_eq!(last.window_rows, 5);
    }

    #[test]
    fn test_cores_cover_raster_once() {
        let (rows, cols) = (70, 45);
        let mut covered = vec![vec![0u8; cols]; rows];
        for tile in TileIterator::new(rows, cols, 16, 3) {
            for r in tile.row..tile.row + tile.rows {
                for c in tile.col..tile.col + tile.cols {
                    covered[r][c] += 1;
                }
            }
        }
        assert!(covered.iter().flatten().all(|&n| n == 1));
    }

    #[test]
    fn test_identity_kernel_round_trips() {
        let data: Vec<i32> = (0..37 * 23).collect();
        let input = Raster::from_vec(data, 37, 23).unwrap();
        let processor = TiledProcessor::new(8, 2);
        let output = processor.process(&input, |window| Ok(window.clone())).unwrap();
        assert!(output.is_complete());
        assert_eq!(output.raster.data(), input.data());
    }

    #[test]
    fn test_failed_tile_isolated() {
        let input: Raster<u8> = Raster::filled(20, 20, 1);
        let processor = TiledProcessor::new(10, 1).with_mode(ProcessingMode::Sequential);
        let output = processor
            .process(&input, |window| {
                if window.transform().origin_x > 5.0 {
                    Err(Error::Algorithm("boom".into()))
                } else {
                    Ok(window.clone())
                }
            })
            .unwrap();

        // right-hand tiles fail; left-hand tiles still land
        assert_eq!(output.failures.len(), 2);
        assert!(output.failures.iter().all(|f| f.tile.col == 10));
        assert_eq!(output.raster.get(5, 5).unwrap(), 1);
        assert_eq!(output.raster.get(5, 15).unwrap(), 0);
    }

    #[test]
    fn test_wrong_shape_is_a_tile_failure() {
        let input: Raster<u8> = Raster::filled(10, 10, 1);
        let output = TiledProcessor::new(5, 0)
            .process(&input, |_| Ok(Raster::<u8>::new(1, 1)))
            .unwrap();
        assert_eq!(output.failures.len(), 4);
    }
}
