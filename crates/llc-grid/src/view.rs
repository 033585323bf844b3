//! Strided, zero-copy views over LLC sample buffers.
//!
//! A [`ViewGeometry`] maps a logical `(level, row, col)` index onto an element
//! index of the underlying buffer through an offset and one signed stride per
//! axis. Slicing, row reversal, transposition and column-major reshapes are
//! all pure geometry edits, so a face can be cut out of a memory-mapped file
//! and re-oriented without touching a single sample.

use std::ops::Range;

use crate::dtype::ElementType;
use crate::error::{LlcError, Result};

/// Vertical level selection for a read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Levels {
    /// Every level present in the file.
    #[default]
    All,
    /// A single level.
    Single(usize),
    /// A half-open range of levels.
    Range(Range<usize>),
}

impl Levels {
    /// Resolve the selection against the number of levels actually present.
    pub fn resolve(&self, available: usize) -> Result<Range<usize>> {
        let range = match self {
            Levels::All => 0..available,
            Levels::Single(level) => *level..level.saturating_add(1),
            Levels::Range(range) => range.clone(),
        };
        if range.start >= range.end || range.end > available {
            return Err(LlcError::LevelOutOfRange {
                start: range.start,
                end: range.end,
                available,
            });
        }
        Ok(range)
    }
}

impl From<usize> for Levels {
    fn from(level: usize) -> Self {
        Levels::Single(level)
    }
}

impl From<Range<usize>> for Levels {
    fn from(range: Range<usize>) -> Self {
        Levels::Range(range)
    }
}

/// Affine index map from `(level, row, col)` to a buffer element index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewGeometry {
    offset: isize,
    shape: [usize; 3],
    strides: [isize; 3],
}

impl ViewGeometry {
    /// Geometry of a dense column-major (first index fastest) array.
    pub fn column_major(shape: [usize; 3]) -> Self {
        Self {
            offset: 0,
            shape,
            strides: column_major_strides(shape),
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn strides(&self) -> [isize; 3] {
        self.strides
    }

    pub fn offset(&self) -> isize {
        self.offset
    }

    /// Number of elements addressed by the view.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the view addresses a dense column-major block.
    pub fn is_column_major_contiguous(&self) -> bool {
        self.strides == column_major_strides(self.shape)
    }

    /// Buffer element index of `(level, row, col)`, or `None` when out of bounds.
    pub fn index(&self, level: usize, row: usize, col: usize) -> Option<usize> {
        if level >= self.shape[0] || row >= self.shape[1] || col >= self.shape[2] {
            return None;
        }
        Some(self.linear(level, row, col))
    }

    fn linear(&self, level: usize, row: usize, col: usize) -> usize {
        let address = self.offset
            + level as isize * self.strides[0]
            + row as isize * self.strides[1]
            + col as isize * self.strides[2];
        address as usize
    }

    /// Lowest and highest element index the view can touch.
    pub fn address_bounds(&self) -> Option<(isize, isize)> {
        if self.is_empty() {
            return None;
        }
        let mut low = self.offset;
        let mut high = self.offset;
        for axis in 0..3 {
            let span = (self.shape[axis] as isize - 1) * self.strides[axis];
            if span < 0 {
                low += span;
            } else {
                high += span;
            }
        }
        Some((low, high))
    }

    /// Restrict one axis to `range`.
    pub fn slice_axis(&self, axis: usize, range: Range<usize>) -> Option<Self> {
        if range.start > range.end || range.end > self.shape[axis] {
            return None;
        }
        let mut out = *self;
        out.offset += range.start as isize * self.strides[axis];
        out.shape[axis] = range.end - range.start;
        Some(out)
    }

    /// Reverse the element order along one axis.
    pub fn reverse_axis(&self, axis: usize) -> Self {
        let mut out = *self;
        if self.shape[axis] > 0 {
            out.offset += (self.shape[axis] as isize - 1) * self.strides[axis];
        }
        out.strides[axis] = -self.strides[axis];
        out
    }

    /// Exchange two axes.
    pub fn swap_axes(&self, a: usize, b: usize) -> Self {
        let mut out = *self;
        out.shape.swap(a, b);
        out.strides.swap(a, b);
        out
    }

    /// Reinterpret a dense column-major block with a new shape, in column-major order.
    ///
    /// This is numpy's `reshape(..., order='F')` restricted to views that do
    /// not need a copy.
    pub fn reshape_column_major(&self, shape: [usize; 3]) -> Option<Self> {
        if !self.is_column_major_contiguous() || shape.iter().product::<usize>() != self.len() {
            return None;
        }
        Some(Self {
            offset: self.offset,
            shape,
            strides: column_major_strides(shape),
        })
    }
}

fn column_major_strides(shape: [usize; 3]) -> [isize; 3] {
    let s0 = shape[0] as isize;
    let s1 = shape[1] as isize;
    [1, s0, s0 * s1]
}

/// A read-only `(levels, rows, cols)` view over encoded sample bytes.
///
/// The view borrows the buffer; nothing is decoded until a value is read.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    bytes: &'a [u8],
    dtype: ElementType,
    geometry: ViewGeometry,
}

impl<'a> FieldView<'a> {
    /// View `bytes` as a dense column-major array of `shape`.
    pub fn column_major(bytes: &'a [u8], dtype: ElementType, shape: [usize; 3]) -> Result<Self> {
        Self::from_parts(bytes, dtype, ViewGeometry::column_major(shape))
    }

    /// View `bytes` through an arbitrary geometry, checking that every
    /// addressed sample lies inside the buffer.
    pub fn from_parts(bytes: &'a [u8], dtype: ElementType, geometry: ViewGeometry) -> Result<Self> {
        if let Some((low, high)) = geometry.address_bounds() {
            let capacity = (bytes.len() / dtype.size()) as isize;
            if low < 0 || high >= capacity {
                return Err(LlcError::BufferTooSmall {
                    expected: (high.max(0) as usize + 1) * dtype.size(),
                    actual: bytes.len(),
                });
            }
        }
        Ok(Self {
            bytes,
            dtype,
            geometry,
        })
    }

    /// View `bytes` through `geometry` without checking bounds up front.
    ///
    /// Every read is still bounds-checked: samples outside the buffer come
    /// back as `None` from [`get`](Self::get) and as NaN from [`iter`](Self::iter).
    pub fn from_parts_unchecked(bytes: &'a [u8], dtype: ElementType, geometry: ViewGeometry) -> Self {
        Self {
            bytes,
            dtype,
            geometry,
        }
    }

    /// Replace the geometry of a view whose new geometry is known to stay in bounds.
    pub(crate) fn with_geometry(&self, geometry: ViewGeometry) -> Self {
        Self {
            bytes: self.bytes,
            dtype: self.dtype,
            geometry,
        }
    }

    pub fn geometry(&self) -> ViewGeometry {
        self.geometry
    }

    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    pub fn shape(&self) -> [usize; 3] {
        self.geometry.shape
    }

    pub fn levels(&self) -> usize {
        self.geometry.shape[0]
    }

    pub fn rows(&self) -> usize {
        self.geometry.shape[1]
    }

    pub fn cols(&self) -> usize {
        self.geometry.shape[2]
    }

    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Decode the value at `(level, row, col)`.
    pub fn get(&self, level: usize, row: usize, col: usize) -> Option<f64> {
        let index = self.geometry.index(level, row, col)?;
        self.dtype.decode(self.bytes, index)
    }

    /// Select a sub-range of levels.
    pub fn select_levels(&self, levels: &Levels) -> Result<Self> {
        let available = self.levels();
        let range = levels.resolve(available)?;
        let geometry = self
            .geometry
            .slice_axis(0, range.clone())
            .ok_or(LlcError::LevelOutOfRange {
                start: range.start,
                end: range.end,
                available,
            })?;
        Ok(self.with_geometry(geometry))
    }

    /// Cut a `rows x cols` window out of every level.
    pub fn window(&self, rows: Range<usize>, cols: Range<usize>) -> Result<Self> {
        let out_of_bounds = || LlcError::WindowOutOfBounds {
            requested: format!("rows {:?}, cols {:?}", rows, cols),
            bounds: format!("{} x {}", self.rows(), self.cols()),
        };
        if rows.is_empty() || cols.is_empty() {
            return Err(out_of_bounds());
        }
        let geometry = self
            .geometry
            .slice_axis(1, rows.clone())
            .and_then(|g| g.slice_axis(2, cols.clone()))
            .ok_or_else(out_of_bounds)?;
        Ok(self.with_geometry(geometry))
    }

    /// Values in logical row-major order (level, then row, then column).
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let [levels, rows, cols] = self.shape();
        (0..levels).flat_map(move |level| {
            (0..rows).flat_map(move |row| {
                (0..cols).map(move |col| {
                    let index = self.geometry.linear(level, row, col);
                    self.dtype.decode(self.bytes, index).unwrap_or(f64::NAN)
                })
            })
        })
    }

    /// Decode the whole view into an owned row-major array.
    pub fn to_array(&self) -> FieldArray {
        FieldArray {
            data: self.iter().collect(),
            shape: self.shape(),
        }
    }
}

/// An owned, decoded `(levels, rows, cols)` array in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArray {
    data: Vec<f64>,
    shape: [usize; 3],
}

impl FieldArray {
    /// Wrap row-major data, checking its length against `shape`.
    pub fn new(data: Vec<f64>, shape: [usize; 3]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(LlcError::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, level: usize, row: usize, col: usize) -> Option<f64> {
        let [levels, rows, cols] = self.shape;
        if level >= levels || row >= rows || col >= cols {
            return None;
        }
        self.data.get((level * rows + row) * cols + col).copied()
    }

    /// The `rows x cols` plane of one level.
    pub fn level(&self, level: usize) -> Option<&[f64]> {
        let plane = self.shape[1] * self.shape[2];
        let start = level.checked_mul(plane)?;
        self.data.get(start..start + plane)
    }

    /// Number of finite values; non-finite samples act as the validity mask.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_finite()).count()
    }

    /// Minimum and maximum over finite values.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
