//! Windowed reads of a single tile.

use std::path::Path;

use llc_grid::{Levels, Result, TileSpec};

use crate::model::{LlcModel, XC_FILE, YC_FILE};
use crate::reader::FaceData;

/// A usable sub-region of an LLC model.
#[derive(Clone)]
pub struct Tile<'m> {
    model: &'m LlcModel,
    spec: TileSpec,
}

impl<'m> Tile<'m> {
    pub fn new(model: &'m LlcModel, spec: TileSpec) -> Self {
        Self { model, spec }
    }

    pub fn spec(&self) -> &TileSpec {
        &self.spec
    }

    pub fn id(&self) -> usize {
        self.spec.id
    }

    pub fn face(&self) -> usize {
        self.spec.face
    }

    pub fn nx(&self) -> usize {
        self.spec.nx()
    }

    pub fn ny(&self) -> usize {
        self.spec.ny()
    }

    /// Shape of a full-depth field on this tile.
    pub fn shape(&self) -> [usize; 3] {
        self.spec.shape(self.model.layout().vertical_levels())
    }

    /// Load a field from the data directory, cut to this tile.
    pub fn load_field(&self, name: impl AsRef<Path>, levels: impl Into<Levels>) -> Result<FaceData> {
        self.load_path(self.model.paths().data_file(name), levels)
    }

    /// Load a field from the grid directory, cut to this tile.
    pub fn load_grid(&self, name: impl AsRef<Path>, levels: impl Into<Levels>) -> Result<FaceData> {
        self.load_path(self.model.paths().grid_file(name), levels)
    }

    /// Load any LLC file, cut to this tile.
    pub fn load_path(&self, path: impl AsRef<Path>, levels: impl Into<Levels>) -> Result<FaceData> {
        self.model
            .reader()
            .read_face(path, self.spec.face, levels)?
            .window(self.spec.rows.clone(), self.spec.cols.clone())
    }

    /// Longitude and latitude of the tile's cells, top level only.
    pub fn load_coordinates(&self) -> Result<(FaceData, FaceData)> {
        let lon = self.load_grid(XC_FILE, Levels::Single(0))?;
        let lat = self.load_grid(YC_FILE, Levels::Single(0))?;
        Ok((lon, lat))
    }
}

impl std::fmt::Debug for Tile<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile").field("spec", &self.spec).finish()
    }
}
