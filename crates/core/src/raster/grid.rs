//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{s, Array2, ArrayView2, Zip};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with an associated
/// affine transform and optional no-data value.
///
/// # Example
///
/// ```ignore
/// use urbano_core::Raster;
///
/// let mut mask: Raster<u8> = Raster::new(100, 100);
/// mask.set(10, 20, 1)?;
/// assert_eq!(mask.count_set(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from existing row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Create a zero raster with the same georeferencing but a different cell type
    pub fn with_same_meta<U: RasterElement>(&self) -> Raster<U> {
        Raster {
            data: Array2::zeros(self.data.dim()),
            transform: self.transform,
            nodata: None,
        }
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            nodata: self.nodata,
        }
    }

    /// Replace the cells, keeping georeferencing. The new array must have the same shape.
    pub fn with_data<U: RasterElement>(&self, data: Array2<U>) -> Result<Raster<U>> {
        if data.dim() != self.data.dim() {
            let (er, ec) = self.shape();
            let (ar, ac) = data.dim();
            return Err(Error::ShapeMismatch {
                context: "with_data".to_string(),
                er,
                ec,
                ar,
                ac,
            });
        }
        Ok(Raster {
            data,
            transform: self.transform,
            nodata: None,
        })
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows,
                cols,
            }),
        }
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    /// Copy out the window starting at (row, col), clamped to the raster extent
    pub fn window(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<Raster<T>> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        let row_end = (row + rows).min(self.rows());
        let col_end = (col + cols).min(self.cols());
        Ok(Raster {
            data: self.data.slice(s![row..row_end, col..col_end]).to_owned(),
            transform: self.transform.offset(row, col),
            nodata: self.nodata,
        })
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Check that `other` covers the same pixel grid as `self`.
    pub fn ensure_coregistered<U: RasterElement>(
        &self,
        other: &Raster<U>,
        context: &str,
    ) -> Result<()> {
        if self.shape() != other.shape() {
            let (er, ec) = self.shape();
            let (ar, ac) = other.shape();
            return Err(Error::ShapeMismatch {
                context: context.to_string(),
                er,
                ec,
                ar,
                ac,
            });
        }
        if !self.transform.coregistered_with(other.transform()) {
            return Err(Error::GeoreferenceMismatch {
                context: context.to_string(),
            });
        }
        Ok(())
    }

    // Cell-wise helpers

    /// Apply `f` to every cell, keeping georeferencing
    pub fn map<U, F>(&self, f: F) -> Raster<U>
    where
        U: RasterElement,
        F: Fn(T) -> U + Sync + Send,
    {
        Raster {
            data: self.data.map(|&v| f(v)),
            transform: self.transform,
            nodata: None,
        }
    }

    /// Combine with a co-registered raster cell by cell
    pub fn zip_map<U, V, F>(&self, other: &Raster<U>, context: &str, f: F) -> Result<Raster<V>>
    where
        U: RasterElement,
        V: RasterElement,
        F: Fn(T, U) -> V + Sync + Send,
    {
        self.ensure_coregistered(other, context)?;
        let data = Zip::from(&self.data)
            .and(other.data())
            .map_collect(|&a, &b| f(a, b));
        Ok(Raster {
            data,
            transform: self.transform,
            nodata: None,
        })
    }

    /// Number of cells holding a positive, valid value
    pub fn count_set(&self) -> usize {
        self.data
            .iter()
            .filter(|v| v.is_set() && !self.is_nodata(**v))
            .count()
    }

    /// Number of cells equal to the no-data value
    pub fn count_nodata(&self) -> usize {
        self.data.iter().filter(|v| self.is_nodata(**v)).count()
    }
}
