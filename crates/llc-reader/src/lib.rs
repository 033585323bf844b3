//! Memory-mapped reads of Lat-Lon-Cube model output.
//!
//! Files are mapped read-only and faces are returned as live views over the
//! mapping: orientation and tile windows only change the index arithmetic,
//! samples are decoded when they are read.
//!
//! # Example
//!
//! ```ignore
//! use llc_grid::{LlcPreset, Levels, TileShape};
//! use llc_reader::{DataPaths, LlcModel};
//!
//! let model = LlcModel::from_preset(LlcPreset::Llc4320, DataPaths::new("run/", "grid/"))?;
//! let index = model.tile_index(TileShape::new(540, 540))?;
//!
//! for tile in model.tiles(&index) {
//!     let theta = tile.load_field("Theta.0000000000.data", Levels::Single(0))?;
//!     let (lon, lat) = tile.load_coordinates()?;
//!     // hand theta/lon/lat to an exporter
//! }
//! ```

pub mod mapped;
pub mod model;
pub mod reader;
pub mod tile;

pub use mapped::MappedFile;
pub use model::{Corner, DataPaths, FaceCorners, LlcModel, XC_FILE, YC_FILE};
pub use reader::{FaceData, FaceReader};
pub use tile::Tile;

pub use llc_grid::{Levels, LlcError, Result};
