//! Synthetic LLC files with predictable contents.
//!
//! Every generated file stores the value `k * 1_000_000 + i * 1000 + x` at
//! on-disk position `(level k, row i, column x)`, so a test can work out
//! exactly which sample should appear at any oriented face position.

use std::io;
use std::path::{Path, PathBuf};

/// On-disk sample encoding of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    F32Be,
    F32Le,
    F64Be,
    F64Le,
}

impl SampleFormat {
    /// Bytes per sample.
    pub fn size(&self) -> usize {
        match self {
            SampleFormat::F32Be | SampleFormat::F32Le => 4,
            SampleFormat::F64Be | SampleFormat::F64Le => 8,
        }
    }

    /// Append `value` in this encoding.
    pub fn push(&self, value: f64, out: &mut Vec<u8>) {
        match self {
            SampleFormat::F32Be => out.extend_from_slice(&(value as f32).to_be_bytes()),
            SampleFormat::F32Le => out.extend_from_slice(&(value as f32).to_le_bytes()),
            SampleFormat::F64Be => out.extend_from_slice(&value.to_be_bytes()),
            SampleFormat::F64Le => out.extend_from_slice(&value.to_le_bytes()),
        }
    }
}

/// Dimensions of a five-face LLC grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlcDims {
    pub side: usize,
    pub top: usize,
    pub levels: usize,
}

impl LlcDims {
    pub const fn new(side: usize, top: usize, levels: usize) -> Self {
        Self { side, top, levels }
    }

    /// Concatenated width of all faces on disk.
    pub fn total_x_dim(&self) -> usize {
        4 * self.side + self.top
    }

    /// Samples in one level.
    pub fn plane_elements(&self) -> usize {
        self.top * self.total_x_dim()
    }

    /// Size of a file holding `levels` levels.
    pub fn file_len(&self, levels: usize, format: SampleFormat) -> usize {
        levels * self.plane_elements() * format.size()
    }

    /// First on-disk column and width of a logical face.
    ///
    /// Disk order is face 0, face 1, cap, face 2, face 3.
    pub fn face_columns(&self, face: usize) -> (usize, usize) {
        let (side, top) = (self.side, self.top);
        match face {
            0 => (0, side),
            1 => (side, side),
            2 => (2 * side + top, side),
            3 => (3 * side + top, side),
            4 => (2 * side, top),
            _ => panic!("LLC grids have 5 faces, got face {}", face),
        }
    }

    /// Oriented `(rows, cols)` of a logical face.
    pub fn face_dims(&self, face: usize) -> (usize, usize) {
        if face == 4 {
            (self.top, self.top)
        } else {
            (self.side, self.top)
        }
    }

    /// Value a correct reader must return at oriented `(k, row, col)` of `face`.
    pub fn oriented_value(&self, face: usize, k: usize, row: usize, col: usize) -> f64 {
        let (start, width) = self.face_columns(face);
        match face {
            // transposed
            0 | 1 => disk_cell_value(k, col, start + row),
            // column-major reshape to (width, top), rows reversed
            2 | 3 => {
                let m = (width - 1 - row) + width * col;
                disk_cell_value(k, m % self.top, start + m / self.top)
            }
            _ => disk_cell_value(k, row, start + col),
        }
    }
}

/// Value stored at on-disk `(level, row, column)` of a generated file.
pub fn disk_cell_value(k: usize, i: usize, x: usize) -> f64 {
    (k * 1_000_000 + i * 1000 + x) as f64
}

/// Bytes of a column-major `(levels, top, total_x_dim)` LLC file.
///
/// `value` receives the on-disk `(k, i, x)` position of each sample.
pub fn llc_file_bytes_with(
    dims: &LlcDims,
    levels: usize,
    format: SampleFormat,
    value: impl Fn(usize, usize, usize) -> f64,
) -> Vec<u8> {
    let nx = dims.total_x_dim();
    let mut bytes = Vec::with_capacity(dims.file_len(levels, format));
    for x in 0..nx {
        for i in 0..dims.top {
            for k in 0..levels {
                format.push(value(k, i, x), &mut bytes);
            }
        }
    }
    bytes
}

/// Bytes of an LLC file filled with [`disk_cell_value`].
pub fn llc_file_bytes(dims: &LlcDims, levels: usize, format: SampleFormat) -> Vec<u8> {
    llc_file_bytes_with(dims, levels, format, disk_cell_value)
}

/// Write an LLC file filled with [`disk_cell_value`] to `dir/name`.
pub fn write_llc_file(
    dir: &Path,
    name: &str,
    dims: &LlcDims,
    levels: usize,
    format: SampleFormat,
) -> io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, llc_file_bytes(dims, levels, format))?;
    Ok(path)
}

/// Longitude written by [`write_grid_files`] at oriented `(row, col)` of `face`.
pub fn synthetic_lon(face: usize, row: usize, col: usize) -> f64 {
    -180.0 + 60.0 * face as f64 + 0.5 * col as f64 + 0.01 * row as f64
}

/// Latitude written by [`write_grid_files`] at oriented `(row, col)` of `face`.
pub fn synthetic_lat(face: usize, row: usize, _col: usize) -> f64 {
    -60.0 + 20.0 * face as f64 + 0.5 * row as f64
}

/// Single-level `XC.data` and `YC.data` in `dir`, encoded as `format`.
///
/// Values are placed on disk so that reading face `f` yields
/// [`synthetic_lon`] and [`synthetic_lat`] at every oriented cell.
pub fn write_grid_files(
    dir: &Path,
    dims: &LlcDims,
    format: SampleFormat,
) -> io::Result<(PathBuf, PathBuf)> {
    let lon = oriented_field(dims, synthetic_lon);
    let lat = oriented_field(dims, synthetic_lat);
    let xc = dir.join("XC.data");
    let yc = dir.join("YC.data");
    std::fs::write(&xc, llc_file_bytes_with(dims, 1, format, |_, i, x| lon[i][x]))?;
    std::fs::write(&yc, llc_file_bytes_with(dims, 1, format, |_, i, x| lat[i][x]))?;
    Ok((xc, yc))
}

/// On-disk `(top, total_x_dim)` plane that reads back as `f(face, row, col)`.
///
/// Grids wider than 1000 columns cannot be decoded from the cell values.
fn oriented_field(dims: &LlcDims, f: impl Fn(usize, usize, usize) -> f64) -> Vec<Vec<f64>> {
    let mut plane = vec![vec![f64::NAN; dims.total_x_dim()]; dims.top];
    for face in 0..5 {
        let (rows, cols) = dims.face_dims(face);
        for row in 0..rows {
            for col in 0..cols {
                // locate the disk cell via its encoded coordinates
                let encoded = dims.oriented_value(face, 0, row, col) as usize;
                let (i, x) = (encoded / 1000, encoded % 1000);
                plane[i][x] = f(face, row, col);
            }
        }
    }
    plane
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: LlcDims = LlcDims::new(12, 4, 3);

    #[test]
    fn test_file_length() {
        let bytes = llc_file_bytes(&SMALL, 3, SampleFormat::F32Be);
        assert_eq!(bytes.len(), 3 * 4 * 52 * 4);
        assert_eq!(SMALL.file_len(1, SampleFormat::F64Le), 4 * 52 * 8);
    }

    #[test]
    fn test_levels_vary_fastest() {
        let bytes = llc_file_bytes(&SMALL, 3, SampleFormat::F32Be);
        let sample = |n: usize| f32::from_be_bytes(bytes[n * 4..n * 4 + 4].try_into().unwrap());
        assert_eq!(sample(0), 0.0);
        assert_eq!(sample(1), 1_000_000.0);
        assert_eq!(sample(3), 1000.0);
        assert_eq!(sample(3 * 4), 1.0);
    }

    #[test]
    fn test_face_columns_partition_width() {
        let mut columns: Vec<(usize, usize)> = (0..5).map(|f| SMALL.face_columns(f)).collect();
        columns.sort();
        let mut next = 0;
        for (start, width) in columns {
            assert_eq!(start, next);
            next += width;
        }
        assert_eq!(next, SMALL.total_x_dim());
    }

    #[test]
    fn test_oriented_value_corners() {
        // transposed face: first row walks down the disk rows
        assert_eq!(SMALL.oriented_value(0, 0, 0, 1), disk_cell_value(0, 1, 0));
        // reshaped face: row 0 is the last reshaped row
        assert_eq!(SMALL.oriented_value(2, 0, 0, 0), disk_cell_value(0, 11 % 4, 28 + 11 / 4));
        // cap is untouched
        assert_eq!(SMALL.oriented_value(4, 2, 3, 1), disk_cell_value(2, 3, 25));
    }

    #[test]
    fn test_oriented_field_covers_every_cell() {
        let plane = oriented_field(&SMALL, |face, _, _| face as f64);
        assert!(plane.iter().flatten().all(|v| !v.is_nan()));
    }
}
