//! Deterministic decomposition of LLC faces into fixed-size tiles.
//!
//! Tile ids are dense and assigned face by face (logical order), row-major
//! inside a face. Forward iteration and random access share one formula:
//! the iterator simply resolves consecutive ids, so the two can never drift
//! apart.

use std::iter::FusedIterator;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LlcError, Result};
use crate::layout::GridLayout;

/// Tile dimensions in grid points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileShape {
    pub rows: usize,
    pub cols: usize,
}

impl TileShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

impl Default for TileShape {
    fn default() -> Self {
        Self::new(540, 540)
    }
}

impl std::fmt::Display for TileShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {}", self.rows, self.cols)
    }
}

/// Coordinates of one tile: its logical face and the window it covers there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileSpec {
    pub id: usize,
    pub face: usize,
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl TileSpec {
    /// Width in grid points.
    pub fn nx(&self) -> usize {
        self.cols.len()
    }

    /// Height in grid points.
    pub fn ny(&self) -> usize {
        self.rows.len()
    }

    /// Array shape of this tile for `levels` levels.
    pub fn shape(&self, levels: usize) -> [usize; 3] {
        [levels, self.ny(), self.nx()]
    }
}

/// Tile decomposition of every face of a [`GridLayout`].
#[derive(Debug, Clone)]
pub struct TileIndex {
    layout: Arc<GridLayout>,
    shape: TileShape,
    /// `(row tiles, col tiles)` per logical face.
    tiles_per_face: Vec<(usize, usize)>,
    /// First tile id of each face, plus the total at the end.
    face_starts: Vec<usize>,
}

impl TileIndex {
    /// Partition every face into `shape` tiles.
    ///
    /// Fails if the shape does not evenly divide some face.
    pub fn new(layout: Arc<GridLayout>, shape: TileShape) -> Result<Self> {
        if shape.rows == 0 || shape.cols == 0 {
            return Err(LlcError::configuration(format!(
                "tile shape {} must be positive",
                shape
            )));
        }

        let mut tiles_per_face = Vec::with_capacity(layout.face_count());
        let mut face_starts = Vec::with_capacity(layout.face_count() + 1);
        face_starts.push(0);
        for face in 0..layout.face_count() {
            let (rows, cols) = layout.face_dims(face)?;
            if rows % shape.rows != 0 {
                return Err(LlcError::IncompatibleTileShape {
                    face,
                    dimension: "row",
                    extent: rows,
                    tile_extent: shape.rows,
                });
            }
            if cols % shape.cols != 0 {
                return Err(LlcError::IncompatibleTileShape {
                    face,
                    dimension: "column",
                    extent: cols,
                    tile_extent: shape.cols,
                });
            }
            let counts = (rows / shape.rows, cols / shape.cols);
            debug!(face, row_tiles = counts.0, col_tiles = counts.1, "Face tiling");
            tiles_per_face.push(counts);
            let last = face_starts[face_starts.len() - 1];
            face_starts.push(last + counts.0 * counts.1);
        }

        let index = Self {
            layout,
            shape,
            tiles_per_face,
            face_starts,
        };
        info!(
            tile_shape = %shape,
            total_tiles = index.total_tiles(),
            "Built tile index"
        );
        Ok(index)
    }

    pub fn layout(&self) -> &Arc<GridLayout> {
        &self.layout
    }

    pub fn tile_shape(&self) -> TileShape {
        self.shape
    }

    /// `(row tiles, col tiles)` of a logical face.
    pub fn tiles_per_face(&self, face: usize) -> Option<(usize, usize)> {
        self.tiles_per_face.get(face).copied()
    }

    /// Range of tile ids belonging to a logical face.
    pub fn face_tile_ids(&self, face: usize) -> Option<Range<usize>> {
        let start = *self.face_starts.get(face)?;
        let end = *self.face_starts.get(face + 1)?;
        Some(start..end)
    }

    pub fn total_tiles(&self) -> usize {
        self.face_starts[self.face_starts.len() - 1]
    }

    /// Look up a tile by id.
    ///
    /// Ids are signed so that ids coming from outside (command lines, file
    /// names) are rejected rather than wrapped.
    pub fn resolve(&self, tile_id: i64) -> Result<TileSpec> {
        let total = self.total_tiles();
        match usize::try_from(tile_id) {
            Ok(id) if id < total => Ok(self.spec_for(id)),
            _ => Err(LlcError::TileIndexOutOfRange { tile_id, total }),
        }
    }

    /// Coordinates of an id known to be in range.
    fn spec_for(&self, id: usize) -> TileSpec {
        let face = self.face_starts.partition_point(|&start| start <= id) - 1;
        let local = id - self.face_starts[face];
        let col_tiles = self.tiles_per_face[face].1;
        let (row_tile, col_tile) = (local / col_tiles, local % col_tiles);
        let row_start = row_tile * self.shape.rows;
        let col_start = col_tile * self.shape.cols;
        TileSpec {
            id,
            face,
            rows: row_start..row_start + self.shape.rows,
            cols: col_start..col_start + self.shape.cols,
        }
    }

    /// Iterate over every tile in id order. Each call starts from the beginning.
    pub fn iter(&self) -> TileIter<'_> {
        TileIter {
            index: self,
            next: 0,
            end: self.total_tiles(),
        }
    }

    /// All tiles in id order.
    pub fn enumerate(&self) -> Vec<TileSpec> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &'a TileIndex {
    type Item = TileSpec;
    type IntoIter = TileIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the tiles of a [`TileIndex`].
#[derive(Debug, Clone)]
pub struct TileIter<'a> {
    index: &'a TileIndex,
    next: usize,
    end: usize,
}

impl Iterator for TileIter<'_> {
    type Item = TileSpec;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let spec = self.index.spec_for(self.next);
        self.next += 1;
        Some(spec)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.next = self.next.saturating_add(n).min(self.end);
        self.next()
    }
}

impl DoubleEndedIterator for TileIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        self.end -= 1;
        Some(self.index.spec_for(self.end))
    }
}

impl ExactSizeIterator for TileIter<'_> {}

impl FusedIterator for TileIter<'_> {}
