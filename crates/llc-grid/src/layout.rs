//! Face geometry of an LLC configuration.
//!
//! On disk, every face occupies a contiguous block of columns of the
//! `(Nz, Ntop, Nxtot)` array, where `Nxtot = 4 * Nside + Ntop`. The standard
//! LLC file stores five faces in this order:
//!
//! | disk | logical | stored as        | transform           | oriented shape |
//! |------|---------|------------------|---------------------|----------------|
//! | 0    | 0       | `Ntop x Nside`   | transpose           | `Nside x Ntop` |
//! | 1    | 1       | `Ntop x Nside`   | transpose           | `Nside x Ntop` |
//! | 2    | 4       | `Ntop x Ntop`    | none (polar cap)    | `Ntop x Ntop`  |
//! | 3    | 2       | `Ntop x Nside`   | reshape + flip rows | `Nside x Ntop` |
//! | 4    | 3       | `Ntop x Nside`   | reshape + flip rows | `Nside x Ntop` |

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dtype::ElementType;
use crate::error::{LlcError, Result};
use crate::view::FieldView;

/// Bytes per sample of the widest supported encoding.
const MAX_SAMPLE_BYTES: usize = 8;

/// Storage rule for one face, in on-disk order.
///
/// `rows` and `cols` are the dimensions of the face after orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRule {
    pub rows: usize,
    pub cols: usize,
    /// Face is stored flattened: reshape column-major and reverse the rows.
    pub reshape: bool,
    /// Transpose the last two axes (after any reshape).
    pub transpose: bool,
}

impl FaceRule {
    /// A face stored exactly as it is presented.
    pub fn plain(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            reshape: false,
            transpose: false,
        }
    }

    /// A face stored with rows and columns exchanged.
    pub fn transposed(rows: usize, cols: usize) -> Self {
        Self {
            transpose: true,
            ..Self::plain(rows, cols)
        }
    }

    /// A face stored flattened and upside down.
    pub fn reshaped(rows: usize, cols: usize) -> Self {
        Self {
            reshape: true,
            ..Self::plain(rows, cols)
        }
    }

    /// Number of on-disk columns the face occupies.
    fn disk_width(&self, top_length: usize) -> Option<usize> {
        let elements = self.rows.checked_mul(self.cols)?;
        if elements == 0 || elements % top_length != 0 {
            return None;
        }
        Some(elements / top_length)
    }

    /// `(rows, cols)` produced by applying this rule to a `top_length x width` block.
    fn oriented_dims(&self, top_length: usize, width: usize) -> (usize, usize) {
        let mut dims = (top_length, width);
        if self.reshape {
            dims = (width, top_length);
        }
        if self.transpose {
            dims = (dims.1, dims.0);
        }
        dims
    }
}

/// Named LLC resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlcPreset {
    Llc4320,
    Llc1080,
}

impl LlcPreset {
    /// `(face_count, side_length, top_length, vertical_levels)`.
    pub fn parameters(&self) -> (usize, usize, usize, usize) {
        match self {
            Self::Llc4320 => (5, 12960, 4320, 90),
            Self::Llc1080 => (5, 3240, 1080, 90),
        }
    }

    pub fn layout(&self) -> Result<GridLayout> {
        let (faces, side, top, levels) = self.parameters();
        GridLayout::new(faces, side, top, levels)
    }

    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "llc4320" | "4320" => Some(Self::Llc4320),
            "llc1080" | "1080" => Some(Self::Llc1080),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llc4320 => "llc4320",
            Self::Llc1080 => "llc1080",
        }
    }
}

impl std::fmt::Display for LlcPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable geometry of one LLC configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    side_length: usize,
    top_length: usize,
    vertical_levels: usize,
    total_x_dim: usize,
    /// Face rules in on-disk order.
    disk_faces: Vec<FaceRule>,
    /// Logical face index -> on-disk face index.
    disk_order: Vec<usize>,
    /// Cumulative on-disk column offsets, one more entry than faces.
    offsets: Vec<usize>,
}

/// The five-face table shared by every standard LLC configuration.
fn llc_face_table(side_length: usize, top_length: usize) -> (Vec<FaceRule>, Vec<usize>) {
    let stored_sideways = FaceRule::transposed(side_length, top_length);
    let stored_flat = FaceRule::reshaped(side_length, top_length);
    let cap = FaceRule::plain(top_length, top_length);
    (
        vec![stored_sideways, stored_sideways, cap, stored_flat, stored_flat],
        // put the cap face at the end
        vec![0, 1, 3, 4, 2],
    )
}

impl GridLayout {
    /// Build the standard LLC layout.
    ///
    /// Fails when `face_count` is not the five faces of the LLC rule table.
    pub fn new(
        face_count: usize,
        side_length: usize,
        top_length: usize,
        vertical_levels: usize,
    ) -> Result<Self> {
        let (faces, order) = llc_face_table(side_length, top_length);
        if face_count != faces.len() {
            return Err(LlcError::configuration(format!(
                "face count {} does not match the {} faces of the LLC rule table",
                face_count,
                faces.len()
            )));
        }
        Self::with_faces(side_length, top_length, vertical_levels, faces, order)
    }

    /// Build a layout from an explicit rule table.
    ///
    /// `disk_faces` lists the rules in on-disk order and `disk_order[i]` is the
    /// on-disk index of logical face `i`.
    pub fn with_faces(
        side_length: usize,
        top_length: usize,
        vertical_levels: usize,
        disk_faces: Vec<FaceRule>,
        disk_order: Vec<usize>,
    ) -> Result<Self> {
        if side_length == 0 || top_length == 0 || vertical_levels == 0 {
            return Err(LlcError::configuration(format!(
                "side length ({}), top length ({}) and vertical levels ({}) must be positive",
                side_length, top_length, vertical_levels
            )));
        }
        if disk_faces.is_empty() {
            return Err(LlcError::configuration("a layout needs at least one face"));
        }
        if disk_order.len() != disk_faces.len() {
            return Err(LlcError::configuration(format!(
                "face order lists {} faces but the rule table has {}",
                disk_order.len(),
                disk_faces.len()
            )));
        }
        let mut seen = vec![false; disk_faces.len()];
        for &disk in &disk_order {
            match seen.get_mut(disk) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(LlcError::configuration(format!(
                        "face order {:?} is not a permutation of 0..{}",
                        disk_order,
                        disk_faces.len()
                    )))
                }
            }
        }

        let too_large = || {
            LlcError::configuration(format!(
                "side length {}, top length {} and {} levels overflow the addressable file size",
                side_length, top_length, vertical_levels
            ))
        };
        let total_x_dim = side_length
            .checked_mul(4)
            .and_then(|sides| sides.checked_add(top_length))
            .ok_or_else(too_large)?;
        // a full-depth file of the widest samples must stay addressable
        top_length
            .checked_mul(total_x_dim)
            .and_then(|plane| plane.checked_mul(vertical_levels))
            .and_then(|elements| elements.checked_mul(MAX_SAMPLE_BYTES))
            .filter(|&bytes| u64::try_from(bytes).is_ok())
            .ok_or_else(too_large)?;
        let mut offsets = Vec::with_capacity(disk_faces.len() + 1);
        offsets.push(0);
        for (disk, rule) in disk_faces.iter().enumerate() {
            let width = rule.disk_width(top_length).ok_or_else(|| {
                LlcError::configuration(format!(
                    "on-disk face {} ({} x {}) is not a whole number of {}-row columns",
                    disk, rule.rows, rule.cols, top_length
                ))
            })?;
            let oriented = rule.oriented_dims(top_length, width);
            if oriented != (rule.rows, rule.cols) {
                return Err(LlcError::configuration(format!(
                    "on-disk face {} declares {} x {} but its orientation rule yields {} x {}",
                    disk, rule.rows, rule.cols, oriented.0, oriented.1
                )));
            }
            let last = offsets[offsets.len() - 1];
            offsets.push(width.checked_add(last).ok_or_else(too_large)?);
        }
        let covered = offsets[offsets.len() - 1];
        if covered != total_x_dim {
            return Err(LlcError::configuration(format!(
                "faces cover {} on-disk columns but the file is {} columns wide",
                covered, total_x_dim
            )));
        }

        debug!(
            faces = disk_faces.len(),
            side_length,
            top_length,
            vertical_levels,
            total_x_dim,
            "Built LLC grid layout"
        );

        Ok(Self {
            side_length,
            top_length,
            vertical_levels,
            total_x_dim,
            disk_faces,
            disk_order,
            offsets,
        })
    }

    /// The 1/48 degree LLC4320 grid.
    pub fn llc4320() -> Result<Self> {
        LlcPreset::Llc4320.layout()
    }

    /// The 1/12 degree LLC1080 grid.
    pub fn llc1080() -> Result<Self> {
        LlcPreset::Llc1080.layout()
    }

    pub fn face_count(&self) -> usize {
        self.disk_faces.len()
    }

    pub fn side_length(&self) -> usize {
        self.side_length
    }

    pub fn top_length(&self) -> usize {
        self.top_length
    }

    pub fn vertical_levels(&self) -> usize {
        self.vertical_levels
    }

    /// Total x extent of the on-disk array.
    pub fn total_x_dim(&self) -> usize {
        self.total_x_dim
    }

    /// Elements in one level of a file.
    pub fn plane_elements(&self) -> usize {
        self.top_length * self.total_x_dim
    }

    /// On-disk index of a logical face.
    pub fn disk_index(&self, face: usize) -> Result<usize> {
        self.disk_order
            .get(face)
            .copied()
            .ok_or(LlcError::FaceIndexOutOfRange {
                face,
                face_count: self.face_count(),
            })
    }

    /// Storage rule of a logical face.
    pub fn face_rule(&self, face: usize) -> Result<&FaceRule> {
        let disk = self.disk_index(face)?;
        Ok(&self.disk_faces[disk])
    }

    /// Oriented `(rows, cols)` of a logical face.
    pub fn face_dims(&self, face: usize) -> Result<(usize, usize)> {
        let rule = self.face_rule(face)?;
        Ok((rule.rows, rule.cols))
    }

    /// On-disk column span of a logical face.
    pub fn face_offset_range(&self, face: usize) -> Result<Range<usize>> {
        let disk = self.disk_index(face)?;
        Ok(self.offsets[disk]..self.offsets[disk + 1])
    }

    /// Number of levels stored in a file of `file_len` bytes.
    ///
    /// Only whole files of exactly 1 or `vertical_levels` levels are accepted.
    pub fn levels_in_file(&self, file_len: u64, dtype: ElementType) -> Option<usize> {
        let level_bytes = (self.plane_elements() * dtype.size()) as u64;
        if file_len == 0 || file_len % level_bytes != 0 {
            return None;
        }
        let levels = (file_len / level_bytes) as usize;
        (levels == 1 || levels == self.vertical_levels).then_some(levels)
    }

    /// Shape of a whole file holding `levels` levels.
    pub fn file_shape(&self, levels: usize) -> [usize; 3] {
        [levels, self.top_length, self.total_x_dim]
    }

    /// Shape of a face's raw on-disk block.
    pub fn raw_face_shape(&self, face: usize, levels: usize) -> Result<[usize; 3]> {
        let range = self.face_offset_range(face)?;
        Ok([levels, self.top_length, range.len()])
    }

    /// Cut a logical face out of a whole-file view and orient it.
    pub fn extract_face<'a>(&self, file: FieldView<'a>, face: usize) -> Result<FieldView<'a>> {
        let [_, rows, cols] = file.shape();
        if rows != self.top_length || cols != self.total_x_dim {
            return Err(LlcError::configuration(format!(
                "file view {:?} does not have the {} x {} layout of this grid",
                file.shape(),
                self.top_length,
                self.total_x_dim
            )));
        }
        let range = self.face_offset_range(face)?;
        let raw = file
            .geometry()
            .slice_axis(2, range)
            .ok_or_else(|| LlcError::configuration("face offsets exceed the file width"))?;
        self.orient_face(file.with_geometry(raw), face)
    }

    /// Apply a face's orientation rule to its raw `(levels, Ntop, width)` block.
    ///
    /// The reshape (with row reversal) always happens before the transpose.
    pub fn orient_face<'a>(&self, raw: FieldView<'a>, face: usize) -> Result<FieldView<'a>> {
        let rule = self.face_rule(face)?;
        let levels = raw.levels();
        let expected = self.raw_face_shape(face, levels)?;
        if raw.shape() != expected {
            return Err(LlcError::configuration(format!(
                "raw block {:?} does not match face {} on-disk shape {:?}",
                raw.shape(),
                face,
                expected
            )));
        }
        let width = expected[2];
        let mut geometry = raw.geometry();
        if rule.reshape {
            geometry = geometry
                .reshape_column_major([levels, width, self.top_length])
                .ok_or_else(|| {
                    LlcError::configuration(format!(
                        "face {} must be a contiguous column-major block to be reshaped",
                        face
                    ))
                })?
                .reverse_axis(1);
        }
        if rule.transpose {
            geometry = geometry.swap_axes(1, 2);
        }
        Ok(raw.with_geometry(geometry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Column-major `(levels, Ntop, Nxtot)` file whose value at `(k, i, x)` is
    /// `k * 1_000_000 + i * 1000 + x`.
    fn synthetic_file(layout: &GridLayout, levels: usize) -> Vec<u8> {
        let [nz, ny, nx] = layout.file_shape(levels);
        let mut bytes = Vec::with_capacity(nz * ny * nx * 4);
        for x in 0..nx {
            for i in 0..ny {
                for k in 0..nz {
                    let value = (k * 1_000_000 + i * 1000 + x) as f32;
                    bytes.extend_from_slice(&value.to_be_bytes());
                }
            }
        }
        bytes
    }

    fn disk_value(k: usize, i: usize, x: usize) -> f64 {
        (k * 1_000_000 + i * 1000 + x) as f64
    }

    #[test]
    fn test_llc_layout_dimensions() {
        let layout = GridLayout::new(5, 12, 4, 3).unwrap();
        assert_eq!(layout.face_count(), 5);
        assert_eq!(layout.total_x_dim(), 52);
        assert_eq!(layout.plane_elements(), 208);
        for face in 0..4 {
            assert_eq!(layout.face_dims(face).unwrap(), (12, 4));
        }
        assert_eq!(layout.face_dims(4).unwrap(), (4, 4));
    }

    #[test]
    fn test_face_count_mismatch() {
        let result = GridLayout::new(6, 12, 4, 3);
        assert!(matches!(result, Err(LlcError::Configuration(_))));
        let result = GridLayout::new(4, 12, 4, 3);
        assert!(matches!(result, Err(LlcError::Configuration(_))));
    }

    #[test]
    fn test_zero_parameters_rejected() {
        assert!(GridLayout::new(5, 0, 4, 3).is_err());
        assert!(GridLayout::new(5, 12, 0, 3).is_err());
        assert!(GridLayout::new(5, 12, 4, 0).is_err());
    }

    #[test]
    fn test_oversized_parameters_rejected() {
        // 4 * side overflows
        let err = GridLayout::new(5, usize::MAX / 2, 4, 1).unwrap_err();
        assert!(matches!(err, LlcError::Configuration(_)));
        assert!(err.to_string().contains("overflow"));

        // width fits but a full file does not
        let err = GridLayout::new(5, 1 << 40, 1 << 20, 1).unwrap_err();
        assert!(matches!(err, LlcError::Configuration(_)));

        let err = GridLayout::new(5, 12960, 4320, usize::MAX / 8).unwrap_err();
        assert!(matches!(err, LlcError::Configuration(_)));
    }

    #[test]
    fn test_face_offset_ranges_follow_disk_order() {
        let layout = GridLayout::new(5, 12, 4, 3).unwrap();
        assert_eq!(layout.face_offset_range(0).unwrap(), 0..12);
        assert_eq!(layout.face_offset_range(1).unwrap(), 12..24);
        assert_eq!(layout.face_offset_range(2).unwrap(), 28..40);
        assert_eq!(layout.face_offset_range(3).unwrap(), 40..52);
        // the cap is logical face 4 but sits third on disk
        assert_eq!(layout.face_offset_range(4).unwrap(), 24..28);
        assert!(matches!(
            layout.face_offset_range(5),
            Err(LlcError::FaceIndexOutOfRange { face: 5, face_count: 5 })
        ));
    }

    #[test]
    fn test_offset_ranges_partition_file_width() {
        for layout in [
            GridLayout::new(5, 12, 4, 3).unwrap(),
            GridLayout::new(5, 6, 2, 1).unwrap(),
            GridLayout::llc1080().unwrap(),
            GridLayout::llc4320().unwrap(),
        ] {
            let mut ranges: Vec<Range<usize>> = (0..layout.face_count())
                .map(|face| layout.face_offset_range(face).unwrap())
                .collect();
            ranges.sort_by_key(|r| r.start);
            let mut cursor = 0;
            for range in &ranges {
                assert_eq!(range.start, cursor, "gap or overlap at {}", cursor);
                assert!(range.end > range.start);
                cursor = range.end;
            }
            assert_eq!(cursor, layout.total_x_dim());
        }
    }

    #[test]
    fn test_presets() {
        let layout = GridLayout::llc4320().unwrap();
        assert_eq!(layout.side_length(), 12960);
        assert_eq!(layout.top_length(), 4320);
        assert_eq!(layout.vertical_levels(), 90);
        assert_eq!(layout.total_x_dim(), 4 * 12960 + 4320);

        let layout = GridLayout::llc1080().unwrap();
        assert_eq!(layout.total_x_dim(), 4 * 3240 + 1080);

        assert_eq!(LlcPreset::from_str("LLC4320"), Some(LlcPreset::Llc4320));
        assert_eq!(LlcPreset::from_str("1080"), Some(LlcPreset::Llc1080));
        assert_eq!(LlcPreset::from_str("llc270"), None);
    }

    #[test]
    fn test_invalid_rule_tables() {
        // not a permutation
        let (faces, _) = llc_face_table(12, 4);
        assert!(GridLayout::with_faces(12, 4, 3, faces.clone(), vec![0, 1, 1, 3, 4]).is_err());
        assert!(GridLayout::with_faces(12, 4, 3, faces.clone(), vec![0, 1, 2]).is_err());

        // declared dims disagree with the orientation rule
        let mut wrong = faces.clone();
        wrong[0] = FaceRule::transposed(4, 12);
        assert!(GridLayout::with_faces(12, 4, 3, wrong, vec![0, 1, 3, 4, 2]).is_err());

        // faces do not cover the file width
        let short = faces[..4].to_vec();
        let result = GridLayout::with_faces(12, 4, 3, short, vec![0, 1, 2, 3]);
        assert!(matches!(result, Err(LlcError::Configuration(msg)) if msg.contains("cover")));

        // contribution is not a whole number of columns
        let ragged = vec![FaceRule::plain(3, 3)];
        assert!(GridLayout::with_faces(1, 4, 1, ragged, vec![0]).is_err());
    }

    #[test]
    fn test_levels_in_file() {
        let layout = GridLayout::new(5, 12, 4, 3).unwrap();
        let level_bytes = 4 * 52 * 4;
        let dtype = ElementType::BIG_F32;
        assert_eq!(layout.levels_in_file(level_bytes, dtype), Some(1));
        assert_eq!(layout.levels_in_file(3 * level_bytes, dtype), Some(3));
        assert_eq!(layout.levels_in_file(2 * level_bytes, dtype), None);
        assert_eq!(layout.levels_in_file(level_bytes + 4, dtype), None);
        assert_eq!(layout.levels_in_file(0, dtype), None);
        assert_eq!(
            layout.levels_in_file(2 * level_bytes, ElementType::BIG_F64),
            Some(1)
        );
    }

    #[test]
    fn test_plain_face_orientation_is_identity() {
        // one plain face spanning the whole file: 2 rows x (4 * 2 + 2) columns
        let layout =
            GridLayout::with_faces(2, 2, 1, vec![FaceRule::plain(2, 10)], vec![0]).unwrap();
        let mut bytes = Vec::new();
        for col in 0..10 {
            for row in 0..2 {
                bytes.extend_from_slice(&((row * 1000 + col) as f32).to_be_bytes());
            }
        }
        let raw = FieldView::column_major(&bytes, ElementType::BIG_F32, [1, 2, 10]).unwrap();
        let oriented = layout.orient_face(raw, 0).unwrap();
        assert_eq!(oriented.shape(), raw.shape());
        for row in 0..2 {
            for col in 0..10 {
                assert_eq!(oriented.get(0, row, col), raw.get(0, row, col));
                assert_eq!(oriented.get(0, row, col), Some((row * 1000 + col) as f64));
            }
        }
    }

    #[test]
    fn test_extract_faces_in_memory() {
        let layout = GridLayout::new(5, 12, 4, 3).unwrap();
        let bytes = synthetic_file(&layout, 3);
        let file =
            FieldView::column_major(&bytes, ElementType::BIG_F32, layout.file_shape(3)).unwrap();

        // transposed face: oriented (r, c) is on-disk (i = c, x = start + r)
        let face = layout.extract_face(file, 1).unwrap();
        assert_eq!(face.shape(), [3, 12, 4]);
        assert_eq!(face.get(2, 5, 3), Some(disk_value(2, 3, 12 + 5)));

        // reshaped face: flat index (11 - r) + 12 * c maps to (i, j) = (m % 4, m / 4)
        let face = layout.extract_face(file, 2).unwrap();
        assert_eq!(face.shape(), [3, 12, 4]);
        for r in 0..12 {
            for c in 0..4 {
                let m = (11 - r) + 12 * c;
                assert_eq!(face.get(1, r, c), Some(disk_value(1, m % 4, 28 + m / 4)));
            }
        }

        // cap face: no transform
        let face = layout.extract_face(file, 4).unwrap();
        assert_eq!(face.shape(), [3, 4, 4]);
        assert_eq!(face.get(0, 1, 2), Some(disk_value(0, 1, 24 + 2)));
    }

    #[test]
    fn test_orient_face_rejects_wrong_shape() {
        let layout = GridLayout::new(5, 12, 4, 1).unwrap();
        let bytes = vec![0u8; 4 * 4 * 12];
        let raw = FieldView::column_major(&bytes, ElementType::BIG_F32, [1, 12, 4]).unwrap();
        assert!(layout.orient_face(raw, 0).is_err());
    }
}
