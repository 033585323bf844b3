//! Common LLC configurations for tests.

use crate::generators::LlcDims;

/// Grid dimensions used across the test suite.
pub mod dims {
    use super::LlcDims;

    /// Tiny three-level grid: 12-cell sides, 4-cell cap.
    pub const SMALL: LlcDims = LlcDims::new(12, 4, 3);

    /// Single-level grid with square faces.
    pub const SQUARE: LlcDims = LlcDims::new(4, 4, 1);

    /// Rectangular faces that split into 2 x 3 tiles of 3 x 2.
    pub const TILEABLE: LlcDims = LlcDims::new(6, 6, 2);
}

/// Full-size presets as `(faces, side, top, levels)`.
pub mod presets {
    pub const LLC4320: (usize, usize, usize, usize) = (5, 12960, 4320, 90);
    pub const LLC1080: (usize, usize, usize, usize) = (5, 3240, 1080, 90);
}

/// Tile shapes with known tile counts.
pub mod tiles {
    /// `(rows, cols, tiles)` for [`super::dims::SMALL`].
    pub const SMALL_4X4: (usize, usize, usize) = (4, 4, 13);

    /// `(rows, cols, tiles)` for [`super::dims::TILEABLE`].
    pub const TILEABLE_3X2: (usize, usize, usize) = (3, 2, 30);

    /// Default shape on LLC4320: 24 x 8 tiles on each side face, 8 x 8 on the cap.
    pub const LLC4320_540: (usize, usize, usize) = (540, 540, 4 * 24 * 8 + 8 * 8);
}

/// Names of output files, in the way MITgcm writes them.
pub mod files {
    pub const THETA: &str = "Theta.0000000000.data";
    pub const SALT: &str = "Salt.0000000000.data";
    pub const ETA: &str = "Eta.0000000000.data";
}
