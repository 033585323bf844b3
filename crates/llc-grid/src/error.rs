//! Error types for LLC grid decoding and tiling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building layouts, reading faces or indexing tiles.
#[derive(Error, Debug)]
pub enum LlcError {
    /// The layout parameters or face rule table are inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The file size does not correspond to 1 or `vertical_levels` levels.
    #[error(
        "file {path:?} is the wrong size: {file_len} bytes is not 1 or {vertical_levels} \
         levels of {plane_elements} elements of {element_size} bytes"
    )]
    FileSizeMismatch {
        path: PathBuf,
        file_len: u64,
        element_size: usize,
        plane_elements: usize,
        vertical_levels: usize,
    },

    /// The tile shape does not evenly divide a face.
    #[error(
        "tile shape is not compatible with face {face}: {dimension} extent {extent} \
         is not a multiple of {tile_extent}"
    )]
    IncompatibleTileShape {
        face: usize,
        dimension: &'static str,
        extent: usize,
        tile_extent: usize,
    },

    /// A tile id outside `[0, total)`.
    #[error("tile id {tile_id} is out of range (total tiles: {total})")]
    TileIndexOutOfRange { tile_id: i64, total: usize },

    /// A logical face index outside `[0, face_count)`.
    #[error("face {face} is out of range (face count: {face_count})")]
    FaceIndexOutOfRange { face: usize, face_count: usize },

    /// A level selection outside the levels present in the data.
    #[error("levels {start}..{end} are out of range (available: {available})")]
    LevelOutOfRange {
        start: usize,
        end: usize,
        available: usize,
    },

    /// A window that does not fit inside the array it is cut from.
    #[error("window {requested} is outside array bounds {bounds}")]
    WindowOutOfBounds { requested: String, bounds: String },

    /// The sample buffer is shorter than the array it should hold.
    #[error("buffer of {actual} bytes is too small for {expected} bytes of samples")]
    BufferTooSmall { expected: usize, actual: usize },

    /// Storage error with the path that caused it.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LlcError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an Io error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error came from the storage layer rather than from geometry.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Result type for LLC operations.
pub type Result<T> = std::result::Result<T, LlcError>;
