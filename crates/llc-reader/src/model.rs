//! An LLC configuration bound to its data and grid directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use llc_grid::{GridLayout, Levels, LlcPreset, Result, TileIndex, TileShape, TileSpec};
use serde::{Deserialize, Serialize};

use crate::reader::{FaceData, FaceReader};
use crate::tile::Tile;

/// Longitude of cell centers.
pub const XC_FILE: &str = "XC.data";
/// Latitude of cell centers.
pub const YC_FILE: &str = "YC.data";

/// Where model output and grid files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub grid_dir: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            grid_dir: PathBuf::from("."),
        }
    }
}

impl DataPaths {
    pub fn new(data_dir: impl Into<PathBuf>, grid_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            grid_dir: grid_dir.into(),
        }
    }

    pub fn data_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(name)
    }

    pub fn grid_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.grid_dir.join(name)
    }
}

/// Grid coordinates at one corner of a face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    pub xc: f64,
    pub yc: f64,
}

/// `XC`/`YC` at the four corners of a face's top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceCorners {
    pub face: usize,
    pub lower_left: Corner,
    pub lower_right: Corner,
    pub upper_left: Corner,
    pub upper_right: Corner,
}

/// A whole LLC setup: geometry, reader and file locations.
pub struct LlcModel {
    layout: Arc<GridLayout>,
    reader: FaceReader,
    paths: DataPaths,
}

impl LlcModel {
    /// Model reading big-endian `f32` files with no map cache.
    pub fn new(layout: Arc<GridLayout>, paths: DataPaths) -> Self {
        let reader = FaceReader::new(layout.clone());
        Self::with_reader(reader, paths)
    }

    /// Model using a preconfigured reader (sample encoding, map cache).
    pub fn with_reader(reader: FaceReader, paths: DataPaths) -> Self {
        Self {
            layout: reader.layout().clone(),
            reader,
            paths,
        }
    }

    pub fn from_preset(preset: LlcPreset, paths: DataPaths) -> Result<Self> {
        Ok(Self::new(Arc::new(preset.layout()?), paths))
    }

    pub fn layout(&self) -> &Arc<GridLayout> {
        &self.layout
    }

    pub fn reader(&self) -> &FaceReader {
        &self.reader
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    /// Read a face of a file in the data directory.
    pub fn load_data_file(
        &self,
        name: impl AsRef<Path>,
        face: usize,
        levels: impl Into<Levels>,
    ) -> Result<FaceData> {
        self.reader
            .read_face(self.paths.data_file(name), face, levels)
    }

    /// Read a face of a file in the grid directory.
    pub fn load_grid_file(
        &self,
        name: impl AsRef<Path>,
        face: usize,
        levels: impl Into<Levels>,
    ) -> Result<FaceData> {
        self.reader
            .read_face(self.paths.grid_file(name), face, levels)
    }

    /// Corner coordinates of every face, from `XC.data` and `YC.data`.
    pub fn describe_faces(&self) -> Result<Vec<FaceCorners>> {
        (0..self.layout.face_count())
            .map(|face| {
                let xc = self.load_grid_file(XC_FILE, face, Levels::Single(0))?;
                let yc = self.load_grid_file(YC_FILE, face, Levels::Single(0))?;
                let last_row = xc.rows() - 1;
                let last_col = xc.cols() - 1;
                let corner = |row: usize, col: usize| Corner {
                    xc: xc.get(0, row, col).unwrap_or(f64::NAN),
                    yc: yc.get(0, row, col).unwrap_or(f64::NAN),
                };
                Ok(FaceCorners {
                    face,
                    lower_left: corner(0, 0),
                    lower_right: corner(0, last_col),
                    upper_left: corner(last_row, 0),
                    upper_right: corner(last_row, last_col),
                })
            })
            .collect()
    }

    /// Tile decomposition of this model's grid.
    pub fn tile_index(&self, shape: TileShape) -> Result<TileIndex> {
        TileIndex::new(self.layout.clone(), shape)
    }

    pub fn tile(&self, spec: TileSpec) -> Tile<'_> {
        Tile::new(self, spec)
    }

    /// Resolve a tile id against `index` and bind it to this model.
    pub fn tile_by_id(&self, index: &TileIndex, tile_id: i64) -> Result<Tile<'_>> {
        Ok(self.tile(index.resolve(tile_id)?))
    }

    /// Every tile of `index`, in id order.
    pub fn tiles<'a>(&'a self, index: &'a TileIndex) -> impl Iterator<Item = Tile<'a>> + 'a {
        index.iter().map(move |spec| self.tile(spec))
    }
}
