//! Lat-Lon-Cube (LLC) grid geometry.
//!
//! MITgcm LLC output files store five faces side by side in a single
//! Fortran-ordered array of shape `(Nz, Ntop, 4 * Nside + Ntop)`. Each face
//! has its own storage convention: some are transposed, some are stored
//! flattened and must be reshaped and flipped, and the polar cap sits in
//! the middle of the file even though consumers expect it last.
//!
//! This crate holds everything about that layout that does not touch the
//! filesystem:
//!
//! - [`GridLayout`]: face table, on-disk offsets and orientation rules
//! - [`FieldView`]: strided, zero-copy views over raw sample bytes
//! - [`TileIndex`]: deterministic partition of every face into tiles
//!
//! # Architecture
//!
//! ```text
//! file bytes ──► FieldView (Nz, Ntop, Nxtot), column-major
//!                   │
//!                   ├─► slice face columns   (GridLayout::face_offset_range)
//!                   ├─► reshape + flip rows  (FaceRule::reshape)
//!                   └─► transpose            (FaceRule::transpose)
//!                          │
//!                          ▼
//!                 oriented face (levels, rows, cols)
//!                          │
//!                          └─► TileIndex windows (TileSpec)
//! ```
//!
//! # Example
//!
//! ```
//! use llc_grid::{GridLayout, TileIndex, TileShape};
//! use std::sync::Arc;
//!
//! let layout = Arc::new(GridLayout::new(5, 12, 4, 3).unwrap());
//! assert_eq!(layout.total_x_dim(), 52);
//!
//! let index = TileIndex::new(layout, TileShape::new(4, 4)).unwrap();
//! let first = index.resolve(0).unwrap();
//! assert_eq!(first.face, 0);
//! assert_eq!(first.rows, 0..4);
//! ```

pub mod dtype;
pub mod error;
pub mod layout;
pub mod tiles;
pub mod view;

pub use dtype::{ByteOrder, ElementType, SampleWidth};
pub use error::{LlcError, Result};
pub use layout::{FaceRule, GridLayout, LlcPreset};
pub use tiles::{TileIndex, TileIter, TileShape, TileSpec};
pub use view::{FieldArray, FieldView, Levels, ViewGeometry};
