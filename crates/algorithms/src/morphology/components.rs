//! Connected-component sizing for binary masks
//!
//! Groups cells of equal state (set or unset) into connected components
//! and reports the pixel count of the component each cell belongs to.
//! Used to fill small enclosed holes and to drop small noise clusters.

use ndarray::Array2;
use urbano_core::raster::{Connectivity, Raster};
use urbano_core::Result;

/// Component labeling of one state of a binary mask
#[derive(Debug, Clone)]
pub struct Components {
    /// Component id per cell; `0` for cells of the other state
    labels: Array2<u32>,
    /// Pixel count per component id (index 0 unused)
    sizes: Vec<usize>,
}

impl Components {
    /// Number of components found
    pub fn count(&self) -> usize {
        self.sizes.len() - 1
    }

    /// Size of the component containing (row, col), or 0 for cells of the other state
    pub fn size_at(&self, row: usize, col: usize) -> usize {
        self.labels
            .get((row, col))
            .map_or(0, |&label| self.sizes[label as usize])
    }

    /// Sizes of all components, in discovery order
    pub fn sizes(&self) -> &[usize] {
        &self.sizes[1..]
    }
}

/// Label the connected components formed by cells whose state equals `set`.
pub fn label_components(raster: &Raster<u8>, set: bool, connectivity: Connectivity) -> Components {
    let (rows, cols) = raster.shape();
    let data = raster.data();
    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut sizes = vec![0usize];
    let offsets = connectivity.offsets();
    let mut stack = Vec::new();

    for r in 0..rows {
        for c in 0..cols {
            if labels[(r, c)] != 0 || (data[(r, c)] != 0) != set {
                continue;
            }
            let label = sizes.len() as u32;
            let mut size = 0usize;
            labels[(r, c)] = label;
            stack.push((r, c));

            while let Some((cr, cc)) = stack.pop() {
                size += 1;
                for &(dr, dc) in offsets {
                    let nr = cr as isize + dr;
                    let nc = cc as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if labels[(nr, nc)] == 0 && (data[(nr, nc)] != 0) == set {
                        labels[(nr, nc)] = label;
                        stack.push((nr, nc));
                    }
                }
            }
            sizes.push(size);
        }
    }

    Components { labels, sizes }
}

/// Set every unset component smaller than `min_hole_size` pixels.
///
/// The open background touching the raster edge is a component like any
/// other: it is filled only if it is itself smaller than the threshold.
pub fn fill_small_holes(
    raster: &Raster<u8>,
    min_hole_size: usize,
    connectivity: Connectivity,
) -> Result<Raster<u8>> {
    let holes = label_components(raster, false, connectivity);
    let data = Array2::from_shape_fn(raster.shape(), |(r, c)| {
        let hole = holes.size_at(r, c);
        if raster.data()[(r, c)] != 0 || (hole > 0 && hole < min_hole_size) {
            1
        } else {
            0
        }
    });
    raster.with_data(data)
}

/// Clear every set component of at most `max_noise_size` pixels.
pub fn remove_small_components(
    raster: &Raster<u8>,
    max_noise_size: usize,
    connectivity: Connectivity,
) -> Result<Raster<u8>> {
    let components = label_components(raster, true, connectivity);
    let data = Array2::from_shape_fn(raster.shape(), |(r, c)| {
        let size = components.size_at(r, c);
        u8::from(size > max_noise_size)
    });
    raster.with_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_rows(rows: &[&str]) -> Raster<u8> {
        let cols = rows[0].len();
        let data = rows
            .iter()
            .flat_map(|row| row.bytes().map(|b| u8::from(b == b'#')))
            .collect();
        Raster::from_vec(data, rows.len(), cols).unwrap()
    }

    #[test]
    fn test_diagonal_connectivity() {
        let raster = from_rows(&[
            "#..",
            ".#.",
            "..#",
        ]);
        let eight = label_components(&raster, true, Connectivity::Eight);
        assert_eq!(eight.count(), 1);
        assert_eq!(eight.size_at(1, 1), 3);

        let four = label_components(&raster, true, Connectivity::Four);
        assert_eq!(four.count(), 3);
        assert_eq!(four.size_at(0, 1), 0);
    }

    #[test]
    fn test_fill_small_holes() {
        let raster = from_rows(&[
            ".......",
            ".#####.",
            ".#..##.",
            ".#####.",
            ".......",
        ]);
        let filled = fill_small_holes(&raster, 3, Connectivity::Eight).unwrap();
        assert_eq!(filled.get(2, 2).unwrap(), 1);
        assert_eq!(filled.get(2, 3).unwrap(), 1);
        // outer background is a 20-cell component
        assert_eq!(filled.get(0, 0).unwrap(), 0);

        let kept = fill_small_holes(&raster, 2, Connectivity::Eight).unwrap();
        assert_eq!(kept.get(2, 2).unwrap(), 0);
    }

    #[test]
    fn test_remove_small_components() {
        let raster = from_rows(&[
            "##....###",
            "##....###",
            "......#..",
        ]);
        let cleaned = remove_small_components(&raster, 5, Connectivity::Eight).unwrap();
        // 4-cell block removed, 7-cell block kept
        assert_eq!(cleaned.get(0, 0).unwrap(), 0);
        assert_eq!(cleaned.get(0, 6).unwrap(), 1);
        assert_eq!(cleaned.get(2, 6).unwrap(), 1);
        assert_eq!(cleaned.count_set(), 7);
    }

    #[test]
    fn test_remove_keeps_component_just_above_threshold() {
        let raster = from_rows(&["######"]);
        let cleaned = remove_small_components(&raster, 5, Connectivity::Eight).unwrap();
        assert_eq!(cleaned.count_set(), 6);
        let five = from_rows(&["#####."]);
        let cleaned = remove_small_components(&five, 5, Connectivity::Eight).unwrap();
        assert_eq!(cleaned.count_set(), 0);
    }
}
